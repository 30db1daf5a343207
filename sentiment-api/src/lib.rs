pub mod analyzer;
pub mod cache;
pub mod dataset;
pub mod error;
pub mod routes;

pub use analyzer::{AnalyzeParams, Analyzer, ALL_SUBREDDITS};
pub use cache::{CacheKey, ResponseCache};
pub use dataset::{effective_comment_budget, DatasetBuilder};
pub use error::ApiError;
pub use routes::{build_router, AppState};
