//! mock-interview: real-time multimodal interview session engine
//!
//! Asks questions through a speech synthesizer, captures spoken or typed
//! answers, smooths a noisy camera signal into engagement metrics, and
//! scores each answer. All hardware sits behind the traits in
//! [`capabilities`], so the engine runs against console stand-ins or fakes.

pub mod bank;
pub mod capabilities;
pub mod capture;
pub mod clock;
pub mod config;
pub mod engagement;
pub mod events;
pub mod feedback;
pub mod ipc;
pub mod lifecycle;
pub mod playback;
pub mod state;
