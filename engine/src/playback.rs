//! Speech playback controller
//!
//! Speaks one utterance at a time: a new `speak` cancels the one in flight.
//! Without a synthesizer every request completes immediately, so callers
//! waiting on playback are never blocked.

use tracing::{debug, info, warn};

use crate::capabilities::{SpeechSynthesizer, SynthesisEvent, Utterance, UtteranceId, Voice};
use crate::config::SpeechSettings;

const PITCH: f32 = 1.0;

/// Result of a speak request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speak {
    /// Utterance handed to the synthesizer; completion arrives as an event
    Started(UtteranceId),
    /// No synthesizer, or it refused; treat as already completed
    Skipped,
}

/// How an utterance finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    Completed(UtteranceId),
    Cancelled(UtteranceId),
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackState {
    Idle,
    Speaking(UtteranceId),
    Paused(UtteranceId),
}

pub struct PlaybackController {
    synth: Option<Box<dyn SpeechSynthesizer>>,
    settings: SpeechSettings,
    state: PlaybackState,
    next_id: u64,
}

impl PlaybackController {
    /// `synth` is `None` when the host has no speech synthesis
    pub fn new(synth: Option<Box<dyn SpeechSynthesizer>>, settings: SpeechSettings) -> Self {
        Self {
            synth,
            settings,
            state: PlaybackState::Idle,
            next_id: 1,
        }
    }

    pub fn is_available(&self) -> bool {
        self.synth.is_some()
    }

    /// Whether an utterance is playing or paused
    pub fn is_speaking(&self) -> bool {
        self.current().is_some()
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, PlaybackState::Paused(_))
    }

    fn current(&self) -> Option<UtteranceId> {
        match self.state {
            PlaybackState::Idle => None,
            PlaybackState::Speaking(id) | PlaybackState::Paused(id) => Some(id),
        }
    }

    /// Speak `text`, cancelling anything already in flight
    pub fn speak(&mut self, text: &str) -> Speak {
        let previous = self.current();
        let Some(synth) = self.synth.as_mut() else {
            debug!("no speech synthesis, skipping utterance");
            return Speak::Skipped;
        };

        if let Some(id) = previous {
            synth.cancel();
            debug!(id = id.0, "cancelled utterance superseded by a new one");
        }
        self.state = PlaybackState::Idle;

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        let utterance = Utterance {
            text: normalize_for_speech(text),
            voice: select_voice(&synth.voices(), &self.settings.preferred_voices),
            rate: self.settings.rate,
            pitch: PITCH,
        };
        let voice = utterance.voice.clone();

        match synth.speak(id, utterance) {
            Ok(()) => {
                info!(id = id.0, ?voice, "utterance started");
                self.state = PlaybackState::Speaking(id);
                Speak::Started(id)
            }
            Err(e) => {
                warn!(?e, "speech synthesis failed, skipping utterance");
                Speak::Skipped
            }
        }
    }

    /// Pause without losing position; false if nothing to pause or unsupported
    pub fn pause(&mut self) -> bool {
        let (PlaybackState::Speaking(id), Some(synth)) = (self.state, self.synth.as_mut()) else {
            return false;
        };
        if synth.pause() {
            self.state = PlaybackState::Paused(id);
            true
        } else {
            debug!("pause not supported by host");
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        let (PlaybackState::Paused(id), Some(synth)) = (self.state, self.synth.as_mut()) else {
            return false;
        };
        if synth.resume() {
            self.state = PlaybackState::Speaking(id);
            true
        } else {
            false
        }
    }

    /// Cancel the utterance in flight, if any
    pub fn cancel(&mut self) -> Option<UtteranceId> {
        let id = self.current()?;
        if let Some(synth) = self.synth.as_mut() {
            synth.cancel();
        }
        self.state = PlaybackState::Idle;
        info!(id = id.0, "utterance cancelled");
        Some(id)
    }

    /// Match a synthesizer event against the utterance in flight
    pub fn handle_event(&mut self, event: SynthesisEvent) -> Option<PlaybackEnd> {
        let (id, end) = match event {
            SynthesisEvent::Ended(id) => (id, PlaybackEnd::Completed(id)),
            SynthesisEvent::Cancelled(id) => (id, PlaybackEnd::Cancelled(id)),
        };
        if self.current() != Some(id) {
            debug!(id = id.0, "ignoring event for superseded utterance");
            return None;
        }
        self.state = PlaybackState::Idle;
        Some(end)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// First voice matching the earliest preference, else the host default
pub fn select_voice(voices: &[Voice], preferences: &[String]) -> Option<String> {
    preferences
        .iter()
        .find_map(|pref| voices.iter().find(|v| v.name.contains(pref.as_str())))
        .or_else(|| voices.iter().find(|v| v.is_default))
        .map(|v| v.name.clone())
}

/// Put a space after sentence and clause punctuation so the voice pauses
pub fn normalize_for_speech(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if matches!(c, '.' | ',' | ';' | ':' | '?' | '!') {
            if let Some(&next) = chars.peek() {
                if next.is_alphabetic() {
                    out.push(' ');
                }
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::testing::{voice, FakeSynthesizer, SynthLog};
    use std::sync::{Arc, Mutex};

    fn controller(can_pause: bool) -> (PlaybackController, Arc<Mutex<SynthLog>>) {
        let (synth, log) = FakeSynthesizer::new(
            vec![voice("Alex", true), voice("Daniel", false), voice("Google US English", false)],
            can_pause,
        );
        (
            PlaybackController::new(Some(Box::new(synth)), SpeechSettings::default()),
            log,
        )
    }

    #[test]
    fn test_voice_preference_order() {
        let voices = vec![voice("Alex", true), voice("Daniel", false), voice("Google UK", false)];
        let prefs = SpeechSettings::default().preferred_voices;
        assert_eq!(select_voice(&voices, &prefs).as_deref(), Some("Google UK"));
        assert_eq!(select_voice(&voices[..2], &prefs).as_deref(), Some("Daniel"));
        assert_eq!(select_voice(&voices[..1], &prefs).as_deref(), Some("Alex"));
        assert_eq!(select_voice(&[], &prefs), None);
    }

    #[test]
    fn test_normalize_inserts_pauses() {
        assert_eq!(
            normalize_for_speech("First,second.Third  item"),
            "First, second. Third item"
        );
        assert_eq!(normalize_for_speech("Version 3.5 ships."), "Version 3.5 ships.");
    }

    #[test]
    fn test_utterance_settings() {
        let (mut playback, log) = controller(true);
        assert!(matches!(playback.speak("Hello.World"), Speak::Started(_)));
        let log = log.lock().unwrap();
        let (_, utterance) = &log.spoken[0];
        assert_eq!(utterance.text, "Hello. World");
        assert_eq!(utterance.voice.as_deref(), Some("Google US English"));
        assert!(utterance.rate < 1.0);
    }

    #[test]
    fn test_last_call_wins() {
        let (mut playback, log) = controller(true);
        let Speak::Started(first) = playback.speak("one") else {
            panic!("expected playback");
        };
        let Speak::Started(second) = playback.speak("two") else {
            panic!("expected playback");
        };
        assert_eq!(log.lock().unwrap().cancels, 1);

        assert_eq!(playback.handle_event(SynthesisEvent::Cancelled(first)), None);
        assert_eq!(playback.handle_event(SynthesisEvent::Ended(first)), None);
        assert!(playback.is_speaking());
        assert_eq!(
            playback.handle_event(SynthesisEvent::Ended(second)),
            Some(PlaybackEnd::Completed(second))
        );
        assert!(!playback.is_speaking());
    }

    #[test]
    fn test_pause_resume() {
        let (mut playback, _log) = controller(true);
        assert!(!playback.pause());
        playback.speak("question");
        assert!(playback.pause());
        assert!(playback.is_paused());
        assert!(playback.is_speaking());
        assert!(playback.resume());
        assert!(!playback.is_paused());
    }

    #[test]
    fn test_unsupported_pause_is_noop() {
        let (mut playback, _log) = controller(false);
        playback.speak("question");
        assert!(!playback.pause());
        assert!(!playback.is_paused());
        assert!(playback.is_speaking());
    }

    #[test]
    fn test_missing_synth_skips() {
        let mut playback = PlaybackController::new(None, SpeechSettings::default());
        assert!(!playback.is_available());
        assert_eq!(playback.speak("anything"), Speak::Skipped);
        assert!(!playback.is_speaking());
        assert_eq!(playback.cancel(), None);
    }
}
