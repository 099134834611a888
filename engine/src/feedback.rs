//! Per-answer feedback reports
//!
//! Content is scored from the answer alone through a pluggable
//! [`ContentScorer`]; delivery comes from the latest engagement snapshot.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bank::{Question, GENERIC_REFERENCE};
use crate::engagement::EngagementMetrics;

/// Delivery score used when no engagement snapshot exists
pub const BASELINE_DELIVERY: u8 = 70;

/// Engagement advisories appended to one report at most
pub const MAX_APPENDED_ADVISORIES: usize = 2;

const STRENGTHS: [&str; 8] = [
    "Good understanding of core concepts",
    "Clear explanation of main points",
    "Well-structured response",
    "Good use of examples",
    "Logical flow of ideas",
    "Demonstrated technical knowledge",
    "Concise and to the point",
    "Addressed all parts of the question",
];

const IMPROVEMENTS: [&str; 8] = [
    "Could provide more specific examples",
    "Consider mentioning alternative approaches",
    "Explanation could be more concise",
    "Some technical details were missing",
    "Could improve the structure of your answer",
    "Try to speak more confidently",
    "Maintain better eye contact",
    "Avoid technical jargon without explanation",
];

const STOPWORDS: [&str; 16] = [
    "what", "when", "where", "which", "would", "your", "with", "that", "this", "have", "they",
    "does", "explain", "describe", "difference", "between",
];

/// Feedback for one answered question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub content_score: u8,
    pub delivery_score: u8,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub reference_answer: String,
}

/// Scores the substance of an answer, 0-100
pub trait ContentScorer: Send {
    fn score(&mut self, question: &str, answer: &str) -> u8;
}

/// Scores by answer length and coverage of the question's key terms
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    const BASE: f32 = 30.0;
    const LENGTH_WEIGHT: f32 = 40.0;
    const COVERAGE_WEIGHT: f32 = 30.0;
    const FULL_LENGTH_WORDS: f32 = 120.0;
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

impl ContentScorer for HeuristicScorer {
    fn score(&mut self, question: &str, answer: &str) -> u8 {
        let words = answer.split_whitespace().count();
        if words == 0 {
            return 0;
        }

        let length = (words as f32 / Self::FULL_LENGTH_WORDS).min(1.0);
        let wanted = terms(question);
        let coverage = if wanted.is_empty() {
            1.0
        } else {
            let found = terms(answer);
            wanted.intersection(&found).count() as f32 / wanted.len() as f32
        };

        let score = Self::BASE + length * Self::LENGTH_WEIGHT + coverage * Self::COVERAGE_WEIGHT;
        score.round().clamp(0.0, 100.0) as u8
    }
}

/// Builds a [`FeedbackReport`] for each submitted answer
pub struct FeedbackSynthesizer {
    scorer: Box<dyn ContentScorer>,
    rng: StdRng,
}

impl FeedbackSynthesizer {
    pub fn new(scorer: Box<dyn ContentScorer>) -> Self {
        Self {
            scorer,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(scorer: Box<dyn ContentScorer>, seed: u64) -> Self {
        Self {
            scorer,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn synthesize(
        &mut self,
        question: &Question,
        answer: &str,
        engagement: Option<&EngagementMetrics>,
    ) -> FeedbackReport {
        let content_score = self.scorer.score(&question.text, answer);
        let delivery_score = engagement
            .map(EngagementMetrics::delivery_score)
            .unwrap_or(BASELINE_DELIVERY);

        let strengths = self.pick(&STRENGTHS);
        let mut improvements = self.pick(&IMPROVEMENTS);
        if let Some(metrics) = engagement {
            let extra: Vec<String> = metrics
                .advisories
                .iter()
                .filter(|a| !improvements.contains(a))
                .take(MAX_APPENDED_ADVISORIES)
                .cloned()
                .collect();
            improvements.extend(extra);
        }

        let reference_answer = question
            .reference
            .clone()
            .unwrap_or_else(|| GENERIC_REFERENCE.to_string());

        debug!(content_score, delivery_score, "feedback synthesized");
        FeedbackReport {
            content_score,
            delivery_score,
            strengths,
            improvements,
            reference_answer,
        }
    }

    /// One to three distinct entries of `pool`
    fn pick(&mut self, pool: &[&str]) -> Vec<String> {
        let count = self.rng.gen_range(1..=3);
        pool.choose_multiple(&mut self.rng, count)
            .map(|s| s.to_string())
            .collect()
    }
}
