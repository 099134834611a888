//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capabilities::PermissionState;
use crate::engagement::EngagementTuning;

/// Most questions a session may ask
pub const MAX_QUESTIONS: u8 = 50;
/// Duration bounds accepted from the configuration screen, in minutes
pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 120;

const DEFAULT_QUESTIONS: u8 = 5;
const DEFAULT_DOMAIN: &str = "default";
const DEFAULT_SPEECH_RATE: f32 = 0.9;

/// Invalid configuration input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("question limit must be between 1 and 50, got {0}")]
    QuestionLimit(u32),

    #[error("duration must be between 5 and 120 minutes, got {0}")]
    DurationMinutes(u32),

    #[error("duration must be at least one second")]
    ZeroDuration,

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// How a session decides it is finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionMode {
    /// A fixed number of questions
    QuestionCount { limit: u8 },
    /// A count-down clock
    Duration { seconds: u32 },
}

/// Session settings, fixed once the session is configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    mode: SessionMode,
    domain: String,
}

impl SessionConfig {
    /// Count-based session with 1..=50 questions
    pub fn question_count(limit: u32, domain: impl Into<String>) -> Result<Self, ConfigError> {
        if limit == 0 || limit > u32::from(MAX_QUESTIONS) {
            return Err(ConfigError::QuestionLimit(limit));
        }
        Ok(Self {
            mode: SessionMode::QuestionCount { limit: limit as u8 },
            domain: domain.into(),
        })
    }

    /// Duration-based session as picked on the configuration screen
    pub fn timed_minutes(minutes: u32, domain: impl Into<String>) -> Result<Self, ConfigError> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
            return Err(ConfigError::DurationMinutes(minutes));
        }
        Self::timed_seconds(minutes * 60, domain)
    }

    /// Duration-based session with an arbitrary positive length
    pub fn timed_seconds(seconds: u32, domain: impl Into<String>) -> Result<Self, ConfigError> {
        if seconds == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(Self {
            mode: SessionMode::Duration { seconds },
            domain: domain.into(),
        })
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Clock length in seconds for duration sessions
    pub fn duration_seconds(&self) -> Option<u32> {
        match self.mode {
            SessionMode::Duration { seconds } => Some(seconds),
            SessionMode::QuestionCount { .. } => None,
        }
    }

    /// How many questions to draw from the bank
    pub fn question_limit(&self) -> usize {
        match self.mode {
            SessionMode::QuestionCount { limit } => usize::from(limit),
            SessionMode::Duration { .. } => usize::from(MAX_QUESTIONS),
        }
    }
}

/// Speech playback settings
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    /// Speech rate, slightly below normal for comprehension
    pub rate: f32,
    /// Voice name fragments, most preferred first
    pub preferred_voices: Vec<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_SPEECH_RATE,
            preferred_voices: ["Google", "Natural", "Samantha", "Daniel"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Host simulation switches used by the binary
#[derive(Debug, Clone)]
pub struct HostSettings {
    pub microphone: PermissionState,
    pub camera: PermissionState,
    /// Run as if the host had no speech synthesis
    pub speech_output: bool,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionConfig,
    pub engagement: EngagementTuning,
    pub speech: SpeechSettings,
    pub host: HostSettings,

    /// Optional JSON question bank merged over the built-in one
    pub question_bank: Option<PathBuf>,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain = lookup("INTERVIEW_DOMAIN")
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());

        let session = match parse::<u32>(&lookup, "INTERVIEW_DURATION_MINUTES")? {
            Some(minutes) => SessionConfig::timed_minutes(minutes, domain)?,
            None => {
                let limit = parse::<u32>(&lookup, "INTERVIEW_QUESTIONS")?
                    .unwrap_or(u32::from(DEFAULT_QUESTIONS));
                SessionConfig::question_count(limit, domain)?
            }
        };

        let defaults = EngagementTuning::default();
        let engagement = EngagementTuning {
            face_threshold: parse(&lookup, "INTERVIEW_FACE_THRESHOLD")?
                .unwrap_or(defaults.face_threshold),
            look_away_threshold: parse(&lookup, "INTERVIEW_LOOK_AWAY_THRESHOLD")?
                .unwrap_or(defaults.look_away_threshold),
            posture_threshold: parse(&lookup, "INTERVIEW_POSTURE_THRESHOLD")?
                .unwrap_or(defaults.posture_threshold),
            sample_period: parse::<u64>(&lookup, "INTERVIEW_SAMPLE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.sample_period),
        };
        if engagement.sample_period.is_zero() {
            return Err(ConfigError::Invalid {
                key: "INTERVIEW_SAMPLE_MS",
                value: "0".to_string(),
            }
            .into());
        }

        let mut speech = SpeechSettings::default();
        if let Some(rate) = parse::<f32>(&lookup, "INTERVIEW_SPEECH_RATE")? {
            if !(0.1..=10.0).contains(&rate) {
                return Err(ConfigError::Invalid {
                    key: "INTERVIEW_SPEECH_RATE",
                    value: rate.to_string(),
                }
                .into());
            }
            speech.rate = rate;
        }

        let host = HostSettings {
            microphone: parse(&lookup, "INTERVIEW_MIC_PERMISSION")?
                .unwrap_or(PermissionState::Prompt),
            camera: parse(&lookup, "INTERVIEW_CAMERA_PERMISSION")?
                .unwrap_or(PermissionState::Prompt),
            speech_output: lookup("INTERVIEW_NO_SPEECH").as_deref() != Some("1"),
        };

        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("mock-interview");

        let socket_path = lookup("INTERVIEW_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("session.sock"));

        Ok(Self {
            session,
            engagement,
            speech,
            host,
            question_bank: lookup("INTERVIEW_QUESTION_BANK").map(PathBuf::from),
            socket_path,
            data_dir,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let mut env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.entry("HOME".to_string())
            .or_insert_with(|| "/home/candidate".to_string());
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.session.mode(), SessionMode::QuestionCount { limit: 5 });
        assert_eq!(config.session.domain(), "default");
        assert_eq!(config.engagement, EngagementTuning::default());
        assert!(config.host.speech_output);
        assert!(config.socket_path.to_string_lossy().contains("mock-interview"));
    }

    #[test]
    fn test_duration_selects_timed_mode() {
        let config = load(&[("INTERVIEW_DURATION_MINUTES", "30"), ("INTERVIEW_QUESTIONS", "3")]).unwrap();
        assert_eq!(config.session.duration_seconds(), Some(1800));
        assert_eq!(config.session.question_limit(), 50);
    }

    #[test]
    fn test_rejects_out_of_range_session() {
        assert!(load(&[("INTERVIEW_QUESTIONS", "51")]).is_err());
        assert!(load(&[("INTERVIEW_QUESTIONS", "0")]).is_err());
        assert!(load(&[("INTERVIEW_DURATION_MINUTES", "4")]).is_err());
        assert!(load(&[("INTERVIEW_DURATION_MINUTES", "121")]).is_err());
        assert!(load(&[("INTERVIEW_QUESTIONS", "many")]).is_err());
    }

    #[test]
    fn test_tuning_overrides() {
        let config = load(&[
            ("INTERVIEW_FACE_THRESHOLD", "4"),
            ("INTERVIEW_SAMPLE_MS", "250"),
            ("INTERVIEW_MIC_PERMISSION", "denied"),
            ("INTERVIEW_NO_SPEECH", "1"),
        ])
        .unwrap();
        assert_eq!(config.engagement.face_threshold, 4);
        assert_eq!(config.engagement.sample_period, Duration::from_millis(250));
        assert_eq!(config.host.microphone, PermissionState::Denied);
        assert!(!config.host.speech_output);
    }

    #[test]
    fn test_session_config_bounds() {
        assert_eq!(
            SessionConfig::question_count(0, "x"),
            Err(ConfigError::QuestionLimit(0))
        );
        assert!(SessionConfig::question_count(50, "x").is_ok());
        assert_eq!(
            SessionConfig::timed_minutes(5, "x").unwrap().duration_seconds(),
            Some(300)
        );
        assert_eq!(
            SessionConfig::timed_seconds(0, "x"),
            Err(ConfigError::ZeroDuration)
        );
    }
}
