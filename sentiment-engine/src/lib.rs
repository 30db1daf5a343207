pub mod classifier;
pub mod huggingface;
pub mod lexicon;
pub mod scorer;

pub use classifier::{RawPrediction, TextClassifier};
pub use huggingface::HuggingFaceClassifier;
pub use lexicon::LexiconClassifier;
pub use scorer::{BatchOutcome, ScoredText, ScoringReport, SentimentScorer};

use sentiment_core::{CoreError, SentimentBackend, SentimentConfig};
use std::sync::Arc;
use tracing::info;

/// Construct the configured classifier backend.
pub fn build_classifier(config: &SentimentConfig) -> Result<Arc<dyn TextClassifier>, CoreError> {
    let classifier: Arc<dyn TextClassifier> = match config.backend {
        SentimentBackend::HuggingFace => Arc::new(HuggingFaceClassifier::new(config)?),
        SentimentBackend::Lexicon => Arc::new(LexiconClassifier::new()),
    };
    info!(
        "Using {:?} sentiment backend ({})",
        config.backend,
        classifier.model_name()
    );
    Ok(classifier)
}
