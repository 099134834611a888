//! Host capabilities consumed by the session engine
//!
//! Speech-to-text, speech synthesis, camera/microphone access and the
//! per-frame visual classifier are supplied from outside. Each one is a
//! trait here; events flow back to the engine over mpsc channels so the
//! orchestrator can be driven by synthetic events in tests.

mod media;
pub mod simulated;

#[cfg(test)]
pub(crate) mod testing;

pub use media::{DeviceKind, MediaHandle, MediaTrack, PermissionState};

use serde::{Deserialize, Serialize};

/// Errors raised by host capabilities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("{0} access was denied")]
    PermissionDenied(DeviceKind),

    #[error("no {0} detected")]
    DeviceNotFound(DeviceKind),

    #[error("{0} is not available on this host")]
    Unavailable(&'static str),

    #[error("device failure: {0}")]
    Device(String),
}

/// Identifies one capture take (one start/stop cycle of recognition)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TakeId(pub u64);

/// Identifies one utterance handed to the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

/// One recognition result at a given position of the take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub text: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Why the recognizer reported an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    /// Microphone permission revoked or refused mid-take
    NotAllowed,
    /// Nothing was heard; the take stays open
    NoSpeech,
    /// Audio capture hardware failed
    AudioCapture,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEventKind {
    /// Results starting at `result_index`; later positions follow in order
    Results {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error(RecognitionFailure),
    /// The recognizer closed the take on its own
    Ended,
}

/// Event emitted by a [`SpeechRecognizer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEvent {
    pub take: TakeId,
    pub kind: RecognitionEventKind,
}

/// Streaming speech-to-text
pub trait SpeechRecognizer: Send {
    /// Open a continuous, interim-results recognition take
    fn start(&mut self, take: TakeId) -> Result<(), MediaError>;

    /// Close the current take; safe to call when idle
    fn stop(&mut self);
}

/// A voice offered by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
    pub is_default: bool,
}

/// Fully prepared utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

/// Completion notification from a [`SpeechSynthesizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisEvent {
    Ended(UtteranceId),
    Cancelled(UtteranceId),
}

/// Text-to-speech output
pub trait SpeechSynthesizer: Send {
    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, id: UtteranceId, utterance: Utterance) -> Result<(), MediaError>;

    /// Returns false when the host cannot pause
    fn pause(&mut self) -> bool;

    /// Returns false when the host cannot resume
    fn resume(&mut self) -> bool;

    fn cancel(&mut self);
}

/// Camera and microphone access
pub trait MediaDevices: Send + Sync {
    /// Current permission, or `None` when the host has no permissions API
    fn permission(&self, kind: DeviceKind) -> Option<PermissionState>;

    /// Open a live input stream, prompting if needed
    fn open(&self, kind: DeviceKind) -> Result<MediaHandle, MediaError>;
}

/// Raw, unsmoothed per-frame classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawFrame {
    pub face: bool,
    pub looking_away: bool,
    pub posture_bad: bool,
}

/// Per-frame visual classifier
pub trait FrameClassifier: Send {
    fn classify(&mut self, camera: &MediaHandle) -> Result<RawFrame, MediaError>;
}
