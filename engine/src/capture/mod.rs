//! Speech capture: microphone permission, recognition takes, and
//! interim/final transcript reconciliation

mod controller;
mod transcript;

pub use controller::{CaptureController, CaptureError, CaptureUpdate, Toggle};
pub use transcript::Transcript;
