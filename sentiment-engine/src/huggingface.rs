//! Hosted inference backend.
//!
//! Talks to a Hugging Face style text-classification endpoint:
//! `POST {base}/{model}` with `{"inputs": [...]}`.

use crate::classifier::{ensure_prediction_count, RawPrediction, TextClassifier};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sentiment_core::{ClassifierError, CoreError, SentimentConfig};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [String],
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    /// One candidate list per input (all labels with scores).
    Nested(Vec<Vec<RawPrediction>>),
    /// One prediction per input.
    Flat(Vec<RawPrediction>),
    Error { error: String },
}

pub struct HuggingFaceClassifier {
    http_client: Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
}

impl std::fmt::Debug for HuggingFaceClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClassifier")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HuggingFaceClassifier {
    pub fn new(config: &SentimentConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/{}",
                config.inference_url.trim_end_matches('/'),
                config.model
            ),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn infer(&self, texts: &[String]) -> Result<Vec<RawPrediction>, CoreError> {
        let body = InferenceRequest {
            inputs: texts,
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Inference request to {} failed: {}", self.endpoint, e);
            CoreError::Classifier(ClassifierError::InferenceFailed {
                reason: e.to_string(),
            })
        })?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CoreError::Classifier(ClassifierError::AuthenticationFailed));
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::NOT_FOUND => {
                return Err(CoreError::Classifier(ClassifierError::ModelUnavailable {
                    model: self.model.clone(),
                }));
            }
            _ => {}
        }

        let text = response.text().await.map_err(|e| {
            CoreError::Classifier(ClassifierError::InferenceFailed {
                reason: e.to_string(),
            })
        })?;

        if !status.is_success() {
            return Err(CoreError::Classifier(ClassifierError::InferenceFailed {
                reason: format!("status {}: {}", status, text),
            }));
        }

        let parsed: InferenceResponse = serde_json::from_str(&text).map_err(|e| {
            CoreError::Classifier(ClassifierError::InvalidResponseFormat {
                details: e.to_string(),
            })
        })?;

        let predictions = match parsed {
            InferenceResponse::Nested(candidates) => candidates
                .into_iter()
                .map(top_candidate)
                .collect::<Result<Vec<_>, _>>()?,
            InferenceResponse::Flat(predictions) => predictions,
            InferenceResponse::Error { error } => {
                return Err(CoreError::Classifier(ClassifierError::InferenceFailed {
                    reason: error,
                }))
            }
        };

        ensure_prediction_count(&predictions, texts.len())?;
        Ok(predictions)
    }
}

fn top_candidate(candidates: Vec<RawPrediction>) -> Result<RawPrediction, CoreError> {
    candidates
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| {
            CoreError::Classifier(ClassifierError::InvalidResponseFormat {
                details: "empty candidate list".to_string(),
            })
        })
}

#[async_trait]
impl TextClassifier for HuggingFaceClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<RawPrediction>, CoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let predictions = self.infer(texts).await?;
        debug!(
            model = %self.model,
            batch = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Classified batch"
        );
        Ok(predictions)
    }

    async fn warm_up(&self) -> Result<(), CoreError> {
        let start = Instant::now();
        self.infer(&["warm up".to_string()]).await?;
        info!(
            "Inference model {} ready after {:?}",
            self.model,
            start.elapsed()
        );
        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
