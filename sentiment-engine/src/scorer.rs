use crate::classifier::{RawPrediction, TextClassifier};
use sentiment_core::{truncate_chars, ErrorExt, Sentiment, SentimentConfig, SentimentCounts};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of classifying one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Scored(Vec<RawPrediction>),
    /// The classifier failed for this batch; every item in it is scored neutral.
    Degraded { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredText {
    pub sentiment: Sentiment,
    pub confidence: f64,
}

impl ScoredText {
    pub const DEGRADED: ScoredText = ScoredText {
        sentiment: Sentiment::Neutral,
        confidence: 0.0,
    };

    fn from_prediction(prediction: &RawPrediction) -> Self {
        let confidence = if prediction.score.is_nan() {
            0.0
        } else {
            prediction.score.clamp(0.0, 1.0)
        };
        Self {
            sentiment: Sentiment::from_raw_label(&prediction.label),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringReport {
    /// One entry per input text, in input order.
    pub scores: Vec<ScoredText>,
    pub counts: SentimentCounts,
    pub degraded_batches: usize,
}

/// Batches texts through a shared classifier and maps the raw labels.
pub struct SentimentScorer {
    classifier: Arc<dyn TextClassifier>,
    batch_size: usize,
    max_input_chars: usize,
}

impl SentimentScorer {
    pub fn new(classifier: Arc<dyn TextClassifier>, batch_size: usize, max_input_chars: usize) -> Self {
        Self {
            classifier,
            batch_size: batch_size.max(1),
            max_input_chars,
        }
    }

    pub fn from_config(classifier: Arc<dyn TextClassifier>, config: &SentimentConfig) -> Self {
        Self::new(classifier, config.batch_size, config.max_input_chars)
    }

    pub fn model_name(&self) -> &str {
        self.classifier.model_name()
    }

    /// One-time initialization. Failure is reported but leaves the scorer usable;
    /// batches that keep failing degrade to neutral.
    pub async fn warm_up(&self) -> bool {
        match self.classifier.warm_up().await {
            Ok(()) => {
                info!("Sentiment model {} initialized", self.model_name());
                true
            }
            Err(e) => {
                e.log_warn();
                warn!(
                    "Sentiment model {} failed to initialize; scoring will degrade until it responds",
                    self.model_name()
                );
                false
            }
        }
    }

    pub async fn classify_chunk(&self, chunk: &[String]) -> BatchOutcome {
        let inputs: Vec<String> = chunk
            .iter()
            .map(|text| truncate_chars(text, self.max_input_chars).to_string())
            .collect();

        match self.classifier.classify_batch(&inputs).await {
            Ok(predictions) if predictions.len() == inputs.len() => BatchOutcome::Scored(predictions),
            Ok(predictions) => BatchOutcome::Degraded {
                reason: format!(
                    "expected {} predictions, got {}",
                    inputs.len(),
                    predictions.len()
                ),
            },
            Err(e) => BatchOutcome::Degraded {
                reason: e.to_string(),
            },
        }
    }

    pub async fn score(&self, texts: &[String]) -> ScoringReport {
        let start = Instant::now();
        let mut report = ScoringReport {
            scores: Vec::with_capacity(texts.len()),
            ..ScoringReport::default()
        };

        for (index, chunk) in texts.chunks(self.batch_size).enumerate() {
            match self.classify_chunk(chunk).await {
                BatchOutcome::Scored(predictions) => {
                    report
                        .scores
                        .extend(predictions.iter().map(ScoredText::from_prediction));
                }
                BatchOutcome::Degraded { reason } => {
                    warn!(
                        batch = index,
                        size = chunk.len(),
                        "Sentiment batch degraded to neutral: {}",
                        reason
                    );
                    report.degraded_batches += 1;
                    report
                        .scores
                        .extend(std::iter::repeat(ScoredText::DEGRADED).take(chunk.len()));
                }
            }
        }

        report.counts = report.scores.iter().map(|s| s.sentiment).collect();
        debug!(
            texts = texts.len(),
            degraded_batches = report.degraded_batches,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scored texts"
        );
        report
    }
}
