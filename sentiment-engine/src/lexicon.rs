//! Offline word-list classifier.
//!
//! Used when no inference endpoint is configured. Counts positive and negative
//! terms, with a simple negation flip ("not good").

use crate::classifier::{RawPrediction, TextClassifier};
use async_trait::async_trait;
use sentiment_core::CoreError;
use std::collections::HashSet;

const MODEL_NAME: &str = "movie-lexicon";

const POSITIVE_WORDS: &[&str] = &[
    "amazing", "awesome", "beautiful", "best", "brilliant", "charming", "classic", "enjoy",
    "enjoyed", "excellent", "fantastic", "fun", "funny", "good", "gorgeous", "great",
    "hilarious", "incredible", "love", "loved", "masterpiece", "perfect", "phenomenal",
    "recommend", "stunning", "superb", "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "awful", "bad", "bland", "boring", "disappointing", "disappointed", "dull", "hate",
    "hated", "horrible", "lame", "mediocre", "mess", "overrated", "pointless", "poor",
    "predictable", "terrible", "waste", "weak", "worse", "worst",
];

const NEGATIONS: &[&str] = &["not", "no", "never", "isn't", "wasn't", "don't", "didn't"];

#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negations: HashSet<&'static str>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negations: NEGATIONS.iter().copied().collect(),
        }
    }

    pub fn classify(&self, text: &str) -> RawPrediction {
        let lowered = text.to_lowercase();
        let mut positive_hits = 0u32;
        let mut negative_hits = 0u32;
        let mut negate = false;

        let words = lowered
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|w| !w.is_empty());

        for word in words {
            if self.negations.contains(word) {
                negate = true;
                continue;
            }

            let polarity = if self.positive.contains(word) {
                Some(true)
            } else if self.negative.contains(word) {
                Some(false)
            } else {
                None
            };

            if let Some(is_positive) = polarity {
                if is_positive != negate {
                    positive_hits += 1;
                } else {
                    negative_hits += 1;
                }
            }
            negate = false;
        }

        let total = positive_hits + negative_hits;
        if total == 0 || positive_hits == negative_hits {
            return RawPrediction::new("NEUTRAL", 0.5);
        }

        let margin = positive_hits.abs_diff(negative_hits) as f64 / total as f64;
        let score = 0.5 + margin / 2.0;
        let label = if positive_hits > negative_hits {
            "POSITIVE"
        } else {
            "NEGATIVE"
        };
        RawPrediction::new(label, score)
    }
}

#[async_trait]
impl TextClassifier for LexiconClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<RawPrediction>, CoreError> {
        Ok(texts.iter().map(|text| self.classify(text)).collect())
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}
