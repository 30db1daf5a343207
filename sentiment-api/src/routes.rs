//! HTTP API routes.

use crate::analyzer::{AnalyzeParams, Analyzer};
use crate::error::ApiError;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sentiment_core::{CoreError, TimeFilter};
use serde::Deserialize;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self { analyzer }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", get(analyze))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Raw `/analyze` query string.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    pub query: Option<String>,
    pub subreddit: Option<String>,
    pub limit: Option<u32>,
    pub time_filter: Option<String>,
    pub include_comments: Option<bool>,
}

impl AnalyzeQuery {
    /// Fill in configured defaults.
    pub fn into_params(self, analyzer: &Analyzer) -> Result<AnalyzeParams, CoreError> {
        let config = analyzer.config();

        let query = self
            .query
            .ok_or_else(|| CoreError::invalid_input("query parameter is required"))?;
        let time_filter = match self.time_filter {
            Some(raw) => raw.parse::<TimeFilter>()?,
            None => TimeFilter::default(),
        };

        Ok(AnalyzeParams {
            query,
            subreddit: self
                .subreddit
                .unwrap_or_else(|| config.default_subreddit.clone()),
            limit: self.limit.unwrap_or(config.post_limit_default),
            time_filter,
            include_comments: self
                .include_comments
                .unwrap_or(config.include_comments_default),
        })
    }
}

async fn analyze(
    State(state): State<AppState>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        CoreError::invalid_input(format!("invalid query parameters: {}", rejection.body_text()))
    })?;

    let params = query.into_params(&state.analyzer)?;
    let response = state.analyzer.analyze(params).await?;
    Ok(Json(response.as_ref()).into_response())
}
