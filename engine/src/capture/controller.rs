//! Speech capture controller
//!
//! Owns the microphone handle and the recognizer for the duration of a
//! take. Every take has its own [`TakeId`]; events from older takes are
//! dropped so stale text never leaks into a new answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::transcript::Transcript;
use crate::capabilities::{
    DeviceKind, MediaDevices, MediaError, MediaHandle, PermissionState, RecognitionEvent,
    RecognitionEventKind, RecognitionFailure, SpeechRecognizer, TakeId,
};

/// Errors surfaced by the capture controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("cannot edit the answer while recording")]
    RecordingInProgress,
}

impl CaptureError {
    /// Whether typed input should replace voice input from now on
    pub fn needs_manual_entry(&self) -> bool {
        matches!(self, CaptureError::Media(_))
    }
}

/// What a recognition event meant for the current take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureUpdate {
    /// Best-known full transcript of the take
    Transcript(String),
    /// The recognizer closed the take; the microphone is released
    Ended,
    /// The take failed; the microphone is released
    Failed(CaptureError),
}

/// Result of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Started(TakeId),
    Stopped,
}

pub struct CaptureController {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    devices: Arc<dyn MediaDevices>,
    microphone: Option<MediaHandle>,
    take: Option<TakeId>,
    next_take: u64,
    transcript: Transcript,
}

impl CaptureController {
    /// `recognizer` is `None` when the host has no speech-to-text
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>, devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            recognizer,
            devices,
            microphone: None,
            take: None,
            next_take: 1,
            transcript: Transcript::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.take.is_some()
    }

    /// Current take's transcript
    pub fn transcript(&self) -> String {
        self.transcript.text()
    }

    /// Acquire the microphone and open a new recognition take
    pub fn start(&mut self) -> Result<TakeId, CaptureError> {
        if let Some(take) = self.take {
            return Ok(take);
        }
        let recognizer = self
            .recognizer
            .as_mut()
            .ok_or(MediaError::Unavailable("speech recognition"))?;

        if self.devices.permission(DeviceKind::Microphone) == Some(PermissionState::Denied) {
            warn!("microphone permission denied");
            return Err(MediaError::PermissionDenied(DeviceKind::Microphone).into());
        }
        let mut microphone = self.devices.open(DeviceKind::Microphone)?;

        let take = TakeId(self.next_take);
        self.next_take += 1;
        if let Err(e) = recognizer.start(take) {
            microphone.release();
            return Err(e.into());
        }

        self.transcript.clear();
        self.microphone = Some(microphone);
        self.take = Some(take);
        info!(take = take.0, "capture started");
        Ok(take)
    }

    /// Close the take and release the microphone; idempotent
    pub fn stop(&mut self) {
        if let Some(take) = self.take.take() {
            if let Some(recognizer) = self.recognizer.as_mut() {
                recognizer.stop();
            }
            info!(take = take.0, "capture stopped");
        }
        if let Some(mut microphone) = self.microphone.take() {
            microphone.release();
        }
    }

    /// Stop if recording, otherwise clear the old transcript and start
    pub fn toggle(&mut self) -> Result<Toggle, CaptureError> {
        if self.is_recording() {
            self.stop();
            Ok(Toggle::Stopped)
        } else {
            self.transcript.clear();
            self.start().map(Toggle::Started)
        }
    }

    /// Replace the transcript with typed text
    pub fn set_manual(&mut self, text: &str) -> Result<String, CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::RecordingInProgress);
        }
        self.transcript.clear();
        Ok(text.trim().to_string())
    }

    /// Reconcile one recognizer event against the current take
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Option<CaptureUpdate> {
        if self.take != Some(event.take) {
            debug!(take = event.take.0, "dropping event from inactive take");
            return None;
        }

        match event.kind {
            RecognitionEventKind::Results {
                result_index,
                results,
            } => self
                .transcript
                .apply(result_index, &results)
                .then(|| CaptureUpdate::Transcript(self.transcript.text())),
            RecognitionEventKind::Error(failure) => {
                let error = match failure {
                    RecognitionFailure::NoSpeech => {
                        debug!("no speech detected, take stays open");
                        return None;
                    }
                    RecognitionFailure::NotAllowed => {
                        MediaError::PermissionDenied(DeviceKind::Microphone)
                    }
                    RecognitionFailure::AudioCapture => {
                        MediaError::DeviceNotFound(DeviceKind::Microphone)
                    }
                    RecognitionFailure::Other(reason) => MediaError::Device(reason),
                };
                warn!(%error, "recognition failed");
                self.stop();
                Some(CaptureUpdate::Failed(error.into()))
            }
            RecognitionEventKind::Ended => {
                self.stop();
                Some(CaptureUpdate::Ended)
            }
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}
