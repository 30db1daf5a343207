use async_trait::async_trait;
use sentiment_core::{ClassifierError, CoreError};
use serde::{Deserialize, Serialize};

/// One classifier output, before mapping onto the three-way taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

impl RawPrediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A pretrained text classifier.
///
/// Implementations are constructed once per process and shared behind an `Arc`;
/// `warm_up` is the one-time initialization step and `classify_batch` must be safe
/// to call concurrently afterwards.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify every text, returning exactly one prediction per input in order.
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<RawPrediction>, CoreError>;

    async fn warm_up(&self) -> Result<(), CoreError> {
        Ok(())
    }

    fn model_name(&self) -> &str;
}

pub(crate) fn ensure_prediction_count(
    predictions: &[RawPrediction],
    expected: usize,
) -> Result<(), CoreError> {
    if predictions.len() != expected {
        return Err(CoreError::Classifier(
            ClassifierError::PredictionCountMismatch {
                expected,
                actual: predictions.len(),
            },
        ));
    }
    Ok(())
}
