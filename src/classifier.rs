//! Stand-in review labeling.
//!
//! Real fake-review detection lives elsewhere; the pipeline only needs
//! something that attaches a label to every record. Two stand-ins are
//! provided: a phrase-list matcher that flags marketing language, and a
//! coin flip for exercising the pipeline with no signal at all.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Review;

pub const LABEL_FAKE: &str = "Fake";
pub const LABEL_GENUINE: &str = "Genuine";

/// Which labeler the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    #[default]
    Keyword,
    Random,
}

/// Trait for review labelers.
pub trait Classifier: Send + Sync {
    fn label(&self, review: &Review) -> String;
}

/// Flags a review as fake when its text contains any suspicious phrase,
/// matched case-insensitively on word boundaries.
pub struct KeywordClassifier {
    patterns: Vec<Regex>,
}

impl KeywordClassifier {
    pub fn new(phrases: &[String]) -> Self {
        let patterns = phrases
            .iter()
            .filter_map(|phrase| {
                let trimmed = phrase.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let escaped = regex::escape(trimmed);
                match Regex::new(&format!(r"(?i)\b{escaped}\b")) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        warn!("Skipping unusable phrase {:?}: {}", trimmed, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn default_phrases() -> Vec<String> {
        [
            "out of this world",
            "amazing experience",
            "free drink",
            "promotion",
            "coupon",
        ]
        .map(String::from)
        .to_vec()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&Self::default_phrases())
    }
}

impl Classifier for KeywordClassifier {
    fn label(&self, review: &Review) -> String {
        let verdict = if self.patterns.iter().any(|p| p.is_match(&review.text)) {
            LABEL_FAKE
        } else {
            LABEL_GENUINE
        };
        verdict.to_string()
    }
}

/// Unbiased coin flip.
pub struct RandomClassifier;

impl Classifier for RandomClassifier {
    fn label(&self, _review: &Review) -> String {
        let verdict = if rand::random::<bool>() {
            LABEL_FAKE
        } else {
            LABEL_GENUINE
        };
        verdict.to_string()
    }
}

/// Build the labeler selected by configuration.
pub fn build(mode: ClassifierMode, phrases: &[String]) -> Arc<dyn Classifier> {
    match mode {
        ClassifierMode::Keyword => Arc::new(KeywordClassifier::new(phrases)),
        ClassifierMode::Random => Arc::new(RandomClassifier),
    }
}
