//! Engagement sampling from the camera feed
//!
//! Raw per-frame face/gaze/posture readings are noisy. Each signal passes
//! through its own hysteresis counter before it may influence the scores,
//! and a snapshot is always produced whole.

mod hysteresis;
mod monitor;
mod sampler;

pub use hysteresis::Hysteresis;
pub use monitor::EngagementMonitor;
pub use sampler::{advisories_for, EngagementSampler, MAX_ADVISORIES, REPOSITION_ADVISORY};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smoothing thresholds and sampling period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementTuning {
    pub face_threshold: u32,
    pub look_away_threshold: u32,
    pub posture_threshold: u32,
    pub sample_period: Duration,
}

impl Default for EngagementTuning {
    fn default() -> Self {
        Self {
            face_threshold: 2,
            look_away_threshold: 3,
            posture_threshold: 2,
            sample_period: Duration::from_secs(1),
        }
    }
}

/// Dominant facial expression of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Neutral,
    Smiling,
    Concerned,
    Confused,
    Focused,
    NotDetected,
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Neutral => write!(f, "Neutral"),
            Expression::Smiling => write!(f, "Smiling"),
            Expression::Concerned => write!(f, "Concerned"),
            Expression::Confused => write!(f, "Confused"),
            Expression::Focused => write!(f, "Focused"),
            Expression::NotDetected => write!(f, "Not detected"),
        }
    }
}

/// One stable engagement snapshot; scores are 0-100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub eye_contact: u8,
    pub posture: u8,
    pub confidence: u8,
    pub attentiveness: u8,
    pub expression: Expression,
    pub advisories: Vec<String>,
}

impl EngagementMetrics {
    /// Snapshot emitted while no face is stabilized
    pub fn absent() -> Self {
        Self {
            eye_contact: 0,
            posture: 0,
            confidence: 0,
            attentiveness: 0,
            expression: Expression::NotDetected,
            advisories: vec![REPOSITION_ADVISORY.to_string()],
        }
    }

    pub fn is_absent(&self) -> bool {
        self.expression == Expression::NotDetected
    }

    /// Mean of eye contact, posture and confidence, rounded
    pub fn delivery_score(&self) -> u8 {
        let sum = u32::from(self.eye_contact) + u32::from(self.posture) + u32::from(self.confidence);
        ((sum as f32) / 3.0).round() as u8
    }
}
