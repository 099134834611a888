//! Smoothing of raw frames into engagement metrics

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::hysteresis::Hysteresis;
use super::{EngagementMetrics, EngagementTuning, Expression};
use crate::capabilities::RawFrame;

/// Upper bound on advisories carried by one snapshot
pub const MAX_ADVISORIES: usize = 3;

pub const REPOSITION_ADVISORY: &str =
    "No face detected. Please position yourself in front of the camera.";

const EYE_CONTACT_ADVISORY: &str =
    "You're looking away from the camera too often. Try to maintain better eye contact.";
const POSTURE_ADVISORY: &str =
    "Your posture needs improvement. Sit up straight and face the camera directly.";
const CONFIDENCE_ADVISORY: &str =
    "You appear nervous. Try to relax your facial muscles and speak with more confidence.";
const ATTENTION_ADVISORY: &str =
    "You seem distracted. Keep your attention on the interviewer.";
const UNEASE_ADVISORY: &str = "You appear confused or concerned. Try to project more confidence.";
const NEUTRAL_ADVISORY: &str =
    "Your expression is very neutral. Try to appear more engaged and enthusiastic.";

const EXPRESSIONS: [Expression; 5] = [
    Expression::Neutral,
    Expression::Smiling,
    Expression::Concerned,
    Expression::Confused,
    Expression::Focused,
];

/// Turns raw per-frame readings into stable engagement snapshots
pub struct EngagementSampler {
    face: Hysteresis,
    looking_away: Hysteresis,
    posture_bad: Hysteresis,
    rng: StdRng,
}

impl EngagementSampler {
    pub fn new(tuning: &EngagementTuning) -> Self {
        Self::with_rng(tuning, StdRng::from_entropy())
    }

    /// Deterministic sampler for reproducible runs
    pub fn seeded(tuning: &EngagementTuning, seed: u64) -> Self {
        Self::with_rng(tuning, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tuning: &EngagementTuning, rng: StdRng) -> Self {
        Self {
            face: Hysteresis::new(tuning.face_threshold),
            looking_away: Hysteresis::new(tuning.look_away_threshold),
            posture_bad: Hysteresis::new(tuning.posture_threshold),
            rng,
        }
    }

    pub fn face_detected(&self) -> bool {
        self.face.is_set()
    }

    pub fn looking_away(&self) -> bool {
        self.looking_away.is_set()
    }

    pub fn posture_bad(&self) -> bool {
        self.posture_bad.is_set()
    }

    /// Forget all accumulated evidence
    pub fn reset(&mut self) {
        self.face.reset();
        self.looking_away.reset();
        self.posture_bad.reset();
    }

    /// Feed one frame and produce a complete snapshot
    pub fn observe(&mut self, frame: RawFrame) -> EngagementMetrics {
        if !self.face.update(frame.face) {
            trace!(counter = self.face.counter(), "face not stabilized");
            return EngagementMetrics::absent();
        }

        let looking_away = self.looking_away.update(frame.looking_away);
        let posture_bad = self.posture_bad.update(frame.posture_bad);

        let eye_contact = if looking_away {
            self.rng.gen_range(10..=49)
        } else {
            self.rng.gen_range(70..=99)
        };
        let posture = if posture_bad {
            self.rng.gen_range(30..=69)
        } else {
            self.rng.gen_range(80..=99)
        };
        let confidence = if looking_away || posture_bad {
            self.rng.gen_range(45..=84)
        } else {
            self.rng.gen_range(60..=99)
        };
        let attentiveness = if looking_away {
            self.rng.gen_range(20..=59)
        } else {
            self.rng.gen_range(70..=99)
        };
        let expression = *EXPRESSIONS
            .choose(&mut self.rng)
            .unwrap_or(&Expression::Neutral);

        let mut metrics = EngagementMetrics {
            eye_contact,
            posture,
            confidence,
            attentiveness,
            expression,
            advisories: Vec::new(),
        };
        metrics.advisories = advisories_for(&metrics);

        trace!(looking_away, posture_bad, ?metrics, "engagement sampled");
        metrics
    }
}

/// Advisories implied by a snapshot's scores, most important first
pub fn advisories_for(metrics: &EngagementMetrics) -> Vec<String> {
    let checks = [
        (metrics.eye_contact < 50, EYE_CONTACT_ADVISORY),
        (metrics.posture < 60, POSTURE_ADVISORY),
        (metrics.confidence < 60, CONFIDENCE_ADVISORY),
        (metrics.attentiveness < 60, ATTENTION_ADVISORY),
        (
            matches!(metrics.expression, Expression::Concerned | Expression::Confused),
            UNEASE_ADVISORY,
        ),
        (
            metrics.expression == Expression::Neutral && metrics.confidence < 70,
            NEUTRAL_ADVISORY,
        ),
    ];

    checks
        .into_iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, advisory)| advisory.to_string())
        .take(MAX_ADVISORIES)
        .collect()
}
