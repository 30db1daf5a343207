//! HTTP mapping for service errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sentiment_core::{CoreError, ErrorExt};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: String,
}

/// A `CoreError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            self.0.log_error();
        }

        // Input errors carry their own message; everything else reports the cause.
        let detail = if self.0.is_client_error() {
            self.0.user_friendly_message()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            detail,
            code: self.0.error_code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiment_core::RedditApiError;

    #[test]
    fn test_input_errors_are_bad_requests() {
        let err = ApiError::from(CoreError::invalid_input("subreddit must be one of [movies]"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_errors_are_server_errors() {
        let err = ApiError::from(CoreError::RedditApi(RedditApiError::SubredditNotFound {
            subreddit: "movies".to_string(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
