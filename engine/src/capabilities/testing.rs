//! Recording fakes for the host capabilities

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    DeviceKind, FrameClassifier, MediaDevices, MediaError, MediaHandle, MediaTrack,
    PermissionState, RawFrame, SpeechRecognizer, SpeechSynthesizer, TakeId, Utterance,
    UtteranceId, Voice,
};

struct LiveTrack(Arc<AtomicUsize>);

impl MediaTrack for LiveTrack {
    fn stop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Devices whose permission and open outcome are set per kind
#[derive(Default)]
pub struct FakeDevices {
    permissions: Mutex<HashMap<DeviceKind, PermissionState>>,
    failures: Mutex<HashMap<DeviceKind, MediaError>>,
    live: HashMap<DeviceKind, Arc<AtomicUsize>>,
}

impl FakeDevices {
    pub fn granted() -> Arc<Self> {
        let devices = Self::with_live_counters();
        devices.set_permission(DeviceKind::Microphone, PermissionState::Granted);
        devices.set_permission(DeviceKind::Camera, PermissionState::Granted);
        Arc::new(devices)
    }

    fn with_live_counters() -> Self {
        let mut live = HashMap::new();
        live.insert(DeviceKind::Microphone, Arc::new(AtomicUsize::new(0)));
        live.insert(DeviceKind::Camera, Arc::new(AtomicUsize::new(0)));
        Self {
            live,
            ..Default::default()
        }
    }

    pub fn set_permission(&self, kind: DeviceKind, state: PermissionState) {
        self.permissions.lock().unwrap().insert(kind, state);
    }

    pub fn fail_open(&self, kind: DeviceKind, error: MediaError) {
        self.failures.lock().unwrap().insert(kind, error);
    }

    /// Number of handles of this kind that are still live
    pub fn live(&self, kind: DeviceKind) -> usize {
        self.live[&kind].load(Ordering::SeqCst)
    }
}

impl MediaDevices for FakeDevices {
    fn permission(&self, kind: DeviceKind) -> Option<PermissionState> {
        self.permissions.lock().unwrap().get(&kind).copied()
    }

    fn open(&self, kind: DeviceKind) -> Result<MediaHandle, MediaError> {
        if let Some(err) = self.failures.lock().unwrap().get(&kind) {
            return Err(err.clone());
        }
        if self.permission(kind) == Some(PermissionState::Denied) {
            return Err(MediaError::PermissionDenied(kind));
        }
        let counter = Arc::clone(&self.live[&kind]);
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(MediaHandle::new(kind, Box::new(LiveTrack(counter))))
    }
}

#[derive(Debug, Default)]
pub struct RecognizerLog {
    pub starts: Vec<TakeId>,
    pub stops: usize,
}

/// Recognizer that records start/stop calls
pub struct FakeRecognizer {
    pub log: Arc<Mutex<RecognizerLog>>,
}

impl FakeRecognizer {
    pub fn new() -> (Self, Arc<Mutex<RecognizerLog>>) {
        let log = Arc::new(Mutex::new(RecognizerLog::default()));
        (Self { log: Arc::clone(&log) }, log)
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&mut self, take: TakeId) -> Result<(), MediaError> {
        self.log.lock().unwrap().starts.push(take);
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().unwrap().stops += 1;
    }
}

#[derive(Debug, Default)]
pub struct SynthLog {
    pub spoken: Vec<(UtteranceId, Utterance)>,
    pub cancels: usize,
    pub pauses: usize,
    pub resumes: usize,
}

/// Synthesizer that records utterances; completion is injected by the test
pub struct FakeSynthesizer {
    voices: Vec<Voice>,
    can_pause: bool,
    log: Arc<Mutex<SynthLog>>,
}

impl FakeSynthesizer {
    pub fn new(voices: Vec<Voice>, can_pause: bool) -> (Self, Arc<Mutex<SynthLog>>) {
        let log = Arc::new(Mutex::new(SynthLog::default()));
        (
            Self {
                voices,
                can_pause,
                log: Arc::clone(&log),
            },
            log,
        )
    }

    pub fn plain() -> (Self, Arc<Mutex<SynthLog>>) {
        Self::new(Vec::new(), true)
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, id: UtteranceId, utterance: Utterance) -> Result<(), MediaError> {
        self.log.lock().unwrap().spoken.push((id, utterance));
        Ok(())
    }

    fn pause(&mut self) -> bool {
        self.log.lock().unwrap().pauses += 1;
        self.can_pause
    }

    fn resume(&mut self) -> bool {
        self.log.lock().unwrap().resumes += 1;
        self.can_pause
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
    }
}

/// Classifier replaying a fixed script, then repeating `fallback`
pub struct ScriptedClassifier {
    script: VecDeque<RawFrame>,
    fallback: RawFrame,
}

impl ScriptedClassifier {
    pub fn new(script: impl IntoIterator<Item = RawFrame>, fallback: RawFrame) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
        }
    }
}

impl FrameClassifier for ScriptedClassifier {
    fn classify(&mut self, _camera: &MediaHandle) -> Result<RawFrame, MediaError> {
        Ok(self.script.pop_front().unwrap_or(self.fallback))
    }
}

pub fn voice(name: &str, is_default: bool) -> Voice {
    Voice {
        name: name.to_string(),
        lang: "en-US".to_string(),
        is_default,
    }
}

pub const FACING: RawFrame = RawFrame {
    face: true,
    looking_away: false,
    posture_bad: false,
};

pub const ABSENT: RawFrame = RawFrame {
    face: false,
    looking_away: false,
    posture_bad: false,
};
