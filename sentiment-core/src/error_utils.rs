use crate::error::*;
use std::fmt::{Debug, Display};
use tracing::{error, warn};

/// Logging, classification and presentation shared by every error type.
pub trait ErrorExt: Display + Debug {
    /// Short name of the error family, used as a log field.
    fn kind(&self) -> &'static str;

    /// Stable machine-readable code.
    fn error_code(&self) -> &'static str;

    fn user_friendly_message(&self) -> String;

    /// True when the caller, not the service, is at fault.
    fn is_client_error(&self) -> bool {
        false
    }

    fn log_error(&self) -> &Self
    where
        Self: Sized,
    {
        error!(kind = self.kind(), code = self.error_code(), details = ?self, "{}", self);
        self
    }

    fn log_warn(&self) -> &Self
    where
        Self: Sized,
    {
        warn!(kind = self.kind(), code = self.error_code(), "{}", self);
        self
    }
}

impl ErrorExt for CoreError {
    fn kind(&self) -> &'static str {
        match self {
            CoreError::RedditApi(e) => e.kind(),
            CoreError::Classifier(e) => e.kind(),
            CoreError::Config(e) => e.kind(),
            _ => "core",
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(e) => e.error_code(),
            CoreError::Classifier(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
            CoreError::Internal { .. } => "INTERNAL",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Classifier(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => "Could not reach an upstream service.".to_string(),
            CoreError::InvalidInput { message } => message.clone(),
            _ => "Analysis failed unexpectedly.".to_string(),
        }
    }

    fn is_client_error(&self) -> bool {
        matches!(self, CoreError::InvalidInput { .. })
    }
}

impl ErrorExt for RedditApiError {
    fn kind(&self) -> &'static str {
        "reddit"
    }

    fn error_code(&self) -> &'static str {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED",
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT",
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN",
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND",
            RedditApiError::NoPostsFound { .. } => "REDDIT_NO_POSTS",
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN",
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT",
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE",
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } | RedditApiError::InvalidToken => {
                "Reddit rejected the app credentials; check client_id and client_secret."
                    .to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => {
                format!("Reddit is rate limiting us; retry in {}s.", retry_after)
            }
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("r/{} does not exist or is private.", subreddit)
            }
            RedditApiError::NoPostsFound { subreddit, .. } => {
                format!("No posts available in r/{} for that time window.", subreddit)
            }
            RedditApiError::RequestTimeout => "Reddit did not answer in time.".to_string(),
            // The display text already reads well for the rest.
            other => other.to_string(),
        }
    }
}

impl ErrorExt for ClassifierError {
    fn kind(&self) -> &'static str {
        "classifier"
    }

    fn error_code(&self) -> &'static str {
        match self {
            ClassifierError::ModelUnavailable { .. } => "CLASSIFIER_MODEL_UNAVAILABLE",
            ClassifierError::InferenceFailed { .. } => "CLASSIFIER_INFERENCE_FAILED",
            ClassifierError::InvalidResponseFormat { .. } => "CLASSIFIER_INVALID_RESPONSE",
            ClassifierError::PredictionCountMismatch { .. } => "CLASSIFIER_COUNT_MISMATCH",
            ClassifierError::AuthenticationFailed => "CLASSIFIER_AUTH_FAILED",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ClassifierError::ModelUnavailable { model } => {
                format!("Sentiment model '{}' is still loading.", model)
            }
            ClassifierError::AuthenticationFailed => {
                "Inference endpoint rejected the configured API token.".to_string()
            }
            _ => "Sentiment scoring failed.".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn kind(&self) -> &'static str {
        "config"
    }

    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR",
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::MissingEnvironmentVariable { var_name } => {
                format!("Set {} before starting the service.", var_name)
            }
            other => other.to_string(),
        }
    }
}
