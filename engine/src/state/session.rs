//! Session aggregate and completion summary

use serde::{Deserialize, Serialize};

use crate::engagement::EngagementMetrics;
use crate::feedback::FeedbackReport;

/// Phase of an interview session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the configuration to be confirmed
    Configuring,
    /// The current question is being spoken
    AskingQuestion,
    /// Input for the current question is open
    Capturing,
    /// A report for the current answer is on screen
    ReviewingFeedback,
    /// Terminal
    Complete,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Configuring
    }
}

impl Phase {
    /// Inside the Active superstate
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Phase::AskingQuestion | Phase::Capturing | Phase::ReviewingFeedback
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Configuring => write!(f, "Configuring"),
            Phase::AskingQuestion => write!(f, "AskingQuestion"),
            Phase::Capturing => write!(f, "Capturing"),
            Phase::ReviewingFeedback => write!(f, "ReviewingFeedback"),
            Phase::Complete => write!(f, "Complete"),
        }
    }
}

/// Snapshot of one session, owned by the state machine
///
/// `answers` and `feedback` always have the same length as `questions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    pub current_index: usize,
    pub phase: Phase,
    /// Present only for duration sessions
    pub remaining_seconds: Option<u32>,
    pub latest_engagement: Option<EngagementMetrics>,
    /// Text shown as the working answer; cleared when a new take starts
    pub transcript: String,
    pub feedback: Vec<Option<FeedbackReport>>,
    pub recording: bool,
    pub speaking: bool,
    pub playback_paused: bool,
    pub camera_on: bool,
    /// Voice capture failed; typed entry is the input path
    pub manual_entry: bool,
}

impl Session {
    pub fn current_question(&self) -> Option<&str> {
        self.questions.get(self.current_index).map(String::as_str)
    }

    pub fn current_answer(&self) -> Option<&str> {
        self.answers.get(self.current_index).map(String::as_str)
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }
}

/// Why a session reached `Complete`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    QuestionsExhausted,
    TimeExpired,
    Abandoned,
}

/// One question of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub question: String,
    pub answer: String,
    pub report: Option<FeedbackReport>,
}

/// Result of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub reason: CompletionReason,
    pub entries: Vec<SummaryEntry>,
    pub answered: usize,
    pub mean_content: Option<u8>,
    pub mean_delivery: Option<u8>,
}

impl SessionSummary {
    pub fn new(session: &Session, reason: CompletionReason) -> Self {
        let entries: Vec<SummaryEntry> = session
            .questions
            .iter()
            .zip(&session.answers)
            .zip(&session.feedback)
            .map(|((question, answer), report)| SummaryEntry {
                question: question.clone(),
                answer: answer.clone(),
                report: report.clone(),
            })
            .collect();

        let reports: Vec<&FeedbackReport> = entries.iter().filter_map(|e| e.report.as_ref()).collect();
        Self {
            reason,
            answered: reports.len(),
            mean_content: mean(reports.iter().map(|r| r.content_score)),
            mean_delivery: mean(reports.iter().map(|r| r.delivery_score)),
            entries,
        }
    }
}

fn mean(scores: impl Iterator<Item = u8>) -> Option<u8> {
    let (sum, count) = scores.fold((0u32, 0u32), |(sum, count), s| (sum + u32::from(s), count + 1));
    (count > 0).then(|| (sum as f32 / count as f32).round() as u8)
}
