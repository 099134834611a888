//! Interim/final transcript reconciliation

use tracing::debug;

use crate::capabilities::RecognitionResult;

/// Furthest a result may land past the last known segment
const MAX_POSITION_GAP: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Segment {
    text: String,
    is_final: bool,
}

/// Best-known transcript of one capture take, by result position
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Vec<Segment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge results starting at `result_index`
    ///
    /// A final segment is never overwritten by an interim one at the same
    /// position. Results positioned more than a few slots past the end are
    /// dropped. Returns true when the rendered text changed.
    pub fn apply(&mut self, result_index: usize, results: &[RecognitionResult]) -> bool {
        let before = self.text();
        for (offset, result) in results.iter().enumerate() {
            let position = match result_index.checked_add(offset) {
                Some(position) if position <= self.segments.len() + MAX_POSITION_GAP => position,
                _ => {
                    debug!(
                        result_index,
                        offset,
                        known = self.segments.len(),
                        "dropping out-of-range result"
                    );
                    continue;
                }
            };
            if position >= self.segments.len() {
                self.segments.resize_with(position + 1, Segment::default);
            }
            let slot = &mut self.segments[position];
            if slot.is_final && !result.is_final {
                continue;
            }
            slot.text = result.text.trim().to_string();
            slot.is_final = result.is_final;
        }
        self.text() != before
    }

    /// Full transcript, segments joined by single spaces
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.text.is_empty())
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }
}
