//! Session state machine
//!
//! Drives a session through five phases:
//! - Configuring: waiting for the configuration to be confirmed
//! - AskingQuestion: the current question is being spoken
//! - Capturing: the candidate may record or type an answer
//! - ReviewingFeedback: the report for the submitted answer is shown
//! - Complete: questions exhausted, time expired, or session left

mod machine;
mod session;

pub use machine::{Controllers, MachineInputs, SessionError, SessionMachine};
pub use session::{CompletionReason, Phase, Session, SessionSummary, SummaryEntry};
