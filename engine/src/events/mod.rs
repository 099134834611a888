//! Events module for session transitions
//!
//! `SessionEvent`s flow out of the state machine to whoever renders the
//! session; `Command`s flow in from the surrounding UI.

use serde::{Deserialize, Serialize};

use crate::engagement::EngagementMetrics;
use crate::feedback::FeedbackReport;
use crate::state::{CompletionReason, Phase, SessionSummary};

/// Events emitted by the state machine during transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Configuration confirmed and questions assigned
    SessionStarted {
        questions: usize,
        duration_seconds: Option<u32>,
    },

    PhaseChanged { from: Phase, to: Phase },

    /// A question is being asked (spoken, or shown if there is no voice)
    QuestionAsked {
        index: usize,
        total: usize,
        text: String,
    },

    /// Capture is open for the current question
    CaptureStarted { index: usize },

    CaptureStopped { index: usize },

    /// Best-known answer text for the current question
    TranscriptUpdated { index: usize, text: String },

    /// Voice capture failed; typed entry is the input path from now on
    CaptureUnavailable { reason: String },

    CameraStarted,

    CameraStopped,

    CameraUnavailable { reason: String },

    EngagementUpdated { metrics: EngagementMetrics },

    ClockTick { remaining_seconds: u32 },

    FeedbackReady { index: usize, report: FeedbackReport },

    /// A command was not legal in the current state
    CommandRejected { command: String, reason: String },

    SessionComplete {
        reason: CompletionReason,
        summary: SessionSummary,
    },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::SessionStarted { questions, .. } => {
                write!(f, "SESSION_STARTED ({} questions)", questions)
            }
            SessionEvent::PhaseChanged { from, to } => write!(f, "PHASE_CHANGED ({} -> {})", from, to),
            SessionEvent::QuestionAsked { index, total, .. } => {
                write!(f, "QUESTION_ASKED ({}/{})", index + 1, total)
            }
            SessionEvent::CaptureStarted { index } => write!(f, "CAPTURE_STARTED (#{})", index + 1),
            SessionEvent::CaptureStopped { index } => write!(f, "CAPTURE_STOPPED (#{})", index + 1),
            SessionEvent::TranscriptUpdated { text, .. } => {
                write!(f, "TRANSCRIPT_UPDATED ({} chars)", text.len())
            }
            SessionEvent::CaptureUnavailable { reason } => write!(f, "CAPTURE_UNAVAILABLE ({})", reason),
            SessionEvent::CameraStarted => write!(f, "CAMERA_STARTED"),
            SessionEvent::CameraStopped => write!(f, "CAMERA_STOPPED"),
            SessionEvent::CameraUnavailable { reason } => write!(f, "CAMERA_UNAVAILABLE ({})", reason),
            SessionEvent::EngagementUpdated { .. } => write!(f, "ENGAGEMENT_UPDATED"),
            SessionEvent::ClockTick { remaining_seconds } => {
                write!(f, "CLOCK_TICK ({}s)", remaining_seconds)
            }
            SessionEvent::FeedbackReady { index, .. } => write!(f, "FEEDBACK_READY (#{})", index + 1),
            SessionEvent::CommandRejected { command, .. } => {
                write!(f, "COMMAND_REJECTED ({})", command)
            }
            SessionEvent::SessionComplete { reason, .. } => {
                write!(f, "SESSION_COMPLETE ({:?})", reason)
            }
        }
    }
}

/// Requests from the UI to the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Confirm the configuration and start the session
    Confirm,
    SubmitAnswer,
    NextQuestion,
    PreviousQuestion,
    ToggleCapture,
    ToggleCamera,
    /// Replace the current answer with typed text
    EditAnswer { text: String },
    PausePlayback,
    ResumePlayback,
    /// Read the reference answer aloud while reviewing feedback
    ListenReference,
    /// Leave the session view
    Leave,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Confirm => "confirm",
            Command::SubmitAnswer => "submit_answer",
            Command::NextQuestion => "next_question",
            Command::PreviousQuestion => "previous_question",
            Command::ToggleCapture => "toggle_capture",
            Command::ToggleCamera => "toggle_camera",
            Command::EditAnswer { .. } => "edit_answer",
            Command::PausePlayback => "pause_playback",
            Command::ResumePlayback => "resume_playback",
            Command::ListenReference => "listen_reference",
            Command::Leave => "leave",
        };
        write!(f, "{}", name)
    }
}
