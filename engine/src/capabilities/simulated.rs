//! Console-backed stand-ins for the host capabilities
//!
//! Used by the binary: the interviewer's voice is printed, typed lines
//! stand in for spoken audio, and the visual classifier is a biased coin.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{
    DeviceKind, FrameClassifier, MediaDevices, MediaError, MediaHandle, MediaTrack,
    PermissionState, RawFrame, RecognitionEvent, RecognitionEventKind, RecognitionResult,
    SpeechRecognizer, SpeechSynthesizer, SynthesisEvent, TakeId, Utterance, UtteranceId, Voice,
};

/// Words per minute of the console voice at rate 1.0
const CONSOLE_WPM: f32 = 170.0;

/// Devices with a fixed permission answer per kind
pub struct SimulatedDevices {
    microphone: PermissionState,
    camera: PermissionState,
}

impl SimulatedDevices {
    pub fn new(microphone: PermissionState, camera: PermissionState) -> Self {
        Self { microphone, camera }
    }
}

struct LoggedTrack(DeviceKind);

impl MediaTrack for LoggedTrack {
    fn stop(&mut self) {
        info!(kind = %self.0, "device released");
    }
}

impl MediaDevices for SimulatedDevices {
    fn permission(&self, kind: DeviceKind) -> Option<PermissionState> {
        Some(match kind {
            DeviceKind::Microphone => self.microphone,
            DeviceKind::Camera => self.camera,
        })
    }

    fn open(&self, kind: DeviceKind) -> Result<MediaHandle, MediaError> {
        match self.permission(kind) {
            Some(PermissionState::Denied) => Err(MediaError::PermissionDenied(kind)),
            _ => {
                info!(kind = %kind, "device opened");
                Ok(MediaHandle::new(kind, Box::new(LoggedTrack(kind))))
            }
        }
    }
}

/// Prints utterances and reports completion after a reading-time delay
pub struct ConsoleSynthesizer {
    events: mpsc::UnboundedSender<SynthesisEvent>,
    pending: Option<(UtteranceId, JoinHandle<()>)>,
}

impl ConsoleSynthesizer {
    pub fn new(events: mpsc::UnboundedSender<SynthesisEvent>) -> Self {
        Self {
            events,
            pending: None,
        }
    }

    fn reading_time(utterance: &Utterance) -> Duration {
        let words = utterance.text.split_whitespace().count().max(1) as f32;
        let wpm = CONSOLE_WPM * utterance.rate.max(0.1);
        Duration::from_secs_f32(words * 60.0 / wpm)
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            name: "Console Natural".to_string(),
            lang: "en-US".to_string(),
            is_default: true,
        }]
    }

    fn speak(&mut self, id: UtteranceId, utterance: Utterance) -> Result<(), MediaError> {
        self.cancel();

        println!("\n  Interviewer: {}\n", utterance.text);
        let delay = Self::reading_time(&utterance);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SynthesisEvent::Ended(id));
        });
        debug!(id = id.0, ?delay, "console utterance scheduled");
        self.pending = Some((id, task));
        Ok(())
    }

    fn pause(&mut self) -> bool {
        false
    }

    fn resume(&mut self) -> bool {
        false
    }

    fn cancel(&mut self) {
        if let Some((id, task)) = self.pending.take() {
            if !task.is_finished() {
                task.abort();
                let _ = self.events.send(SynthesisEvent::Cancelled(id));
            }
        }
    }
}

#[derive(Debug, Default)]
struct DictationState {
    take: Option<TakeId>,
    position: usize,
}

/// Recognizer whose "audio" is text pushed through a [`DictationFeed`]
pub struct ConsoleRecognizer {
    state: Arc<Mutex<DictationState>>,
}

/// The input side of a [`ConsoleRecognizer`]
#[derive(Clone)]
pub struct DictationFeed {
    state: Arc<Mutex<DictationState>>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
}

impl ConsoleRecognizer {
    pub fn new(events: mpsc::UnboundedSender<RecognitionEvent>) -> (Self, DictationFeed) {
        let state = Arc::new(Mutex::new(DictationState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            DictationFeed { state, events },
        )
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&mut self, take: TakeId) -> Result<(), MediaError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MediaError::Device("dictation state poisoned".to_string()))?;
        state.take = Some(take);
        state.position = 0;
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.take = None;
        }
    }
}

impl DictationFeed {
    /// Whether a take is currently listening
    pub fn is_listening(&self) -> bool {
        self.state.lock().map(|s| s.take.is_some()).unwrap_or(false)
    }

    /// Deliver a spoken phrase as an interim result followed by its final
    pub fn speak_line(&self, line: &str) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let Some(take) = state.take else {
            return false;
        };
        let position = state.position;
        state.position += 1;

        let words: Vec<&str> = line.split_whitespace().collect();
        let partial = words[..words.len().div_ceil(2)].join(" ");
        for result in [
            RecognitionResult::interim(partial),
            RecognitionResult::final_(line.trim()),
        ] {
            let _ = self.events.send(RecognitionEvent {
                take,
                kind: RecognitionEventKind::Results {
                    result_index: position,
                    results: vec![result],
                },
            });
        }
        true
    }
}

/// Random classifier biased toward a candidate who mostly faces the camera
pub struct RandomClassifier {
    rng: StdRng,
}

impl RandomClassifier {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for RandomClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClassifier for RandomClassifier {
    fn classify(&mut self, camera: &MediaHandle) -> Result<RawFrame, MediaError> {
        if !camera.is_live() {
            return Err(MediaError::Device("camera track stopped".to_string()));
        }
        Ok(RawFrame {
            face: self.rng.gen_bool(0.8),
            looking_away: self.rng.gen_bool(0.3),
            posture_bad: self.rng.gen_bool(0.3),
        })
    }
}
