use crate::cache::{CacheKey, ResponseCache};
use crate::dataset::DatasetBuilder;
use reddit_client::PostSource;
use sentiment_core::{
    AnalysisConfig, AnalysisResponse, CoreError, PostRecord, RedditPost,
    SentimentCounts, TimeFilter,
};
use sentiment_engine::SentimentScorer;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Channel name that fans out over the whole allow-list.
pub const ALL_SUBREDDITS: &str = "all";

/// Arguments of one `/analyze` call, defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeParams {
    pub query: String,
    pub subreddit: String,
    pub limit: u32,
    pub time_filter: TimeFilter,
    pub include_comments: bool,
}

impl AnalyzeParams {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(
            &self.query,
            &self.subreddit,
            self.limit,
            self.time_filter,
            self.include_comments,
        )
    }
}

/// validate -> fetch -> build dataset -> filter -> score -> respond, memoized by
/// request arguments.
pub struct Analyzer {
    source: Arc<dyn PostSource>,
    scorer: Arc<SentimentScorer>,
    cache: ResponseCache,
    dataset: DatasetBuilder,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(
        source: Arc<dyn PostSource>,
        scorer: Arc<SentimentScorer>,
        cache: ResponseCache,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            source,
            scorer,
            cache,
            dataset: DatasetBuilder::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn analyze(&self, params: AnalyzeParams) -> Result<Arc<AnalysisResponse>, CoreError> {
        let span = info_span!(
            "analyze",
            request_id = %Uuid::new_v4(),
            subreddit = %params.subreddit,
            limit = params.limit,
            time_filter = %params.time_filter,
        );
        self.run(params).instrument(span).await
    }

    async fn run(&self, params: AnalyzeParams) -> Result<Arc<AnalysisResponse>, CoreError> {
        let params = self.validate(params)?;

        let key = params.cache_key();
        if let Some(hit) = self.cache.get(&key).await {
            info!("Cache hit for {}", key);
            return Ok(hit);
        }

        let start = Instant::now();
        let posts = if params.subreddit == ALL_SUBREDDITS {
            self.fetch_all(params.limit, params.time_filter).await?
        } else {
            self.source
                .fetch_top_posts(&params.subreddit, params.limit, params.time_filter)
                .await?
        };
        debug!(posts = posts.len(), "Fetched posts");

        let records = self
            .dataset
            .build(self.source.as_ref(), posts, params.include_comments)
            .await;
        let matching = filter_by_query(records, &params.query);

        let response = if matching.is_empty() {
            info!("No posts matched query {:?}", params.query);
            AnalysisResponse {
                query: params.query.clone(),
                subreddit: params.subreddit.clone(),
                time_filter: params.time_filter,
                counts: SentimentCounts::default(),
                posts: Vec::new(),
            }
        } else {
            self.score(&params, matching).await
        };

        info!(
            posts = response.posts.len(),
            positive = response.counts.positive,
            neutral = response.counts.neutral,
            negative = response.counts.negative,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        let response = Arc::new(response);
        self.cache.insert(key, Arc::clone(&response)).await;
        Ok(response)
    }

    /// Checks arguments before anything leaves the process.
    fn validate(&self, mut params: AnalyzeParams) -> Result<AnalyzeParams, CoreError> {
        params.query = params.query.trim().to_string();
        params.subreddit = params.subreddit.trim().to_string();

        if params.query.is_empty() {
            return Err(CoreError::invalid_input("query must not be empty"));
        }

        if params.subreddit != ALL_SUBREDDITS
            && !self.config.allowed_subreddits.contains(&params.subreddit)
        {
            return Err(CoreError::invalid_input(format!(
                "subreddit must be one of {:?} or \"{}\"",
                self.config.allowed_subreddits, ALL_SUBREDDITS
            )));
        }

        if params.limit == 0 || params.limit > self.config.post_limit_max {
            return Err(CoreError::invalid_input(format!(
                "limit must be between 1 and {}",
                self.config.post_limit_max
            )));
        }

        Ok(params)
    }

    /// One task per allow-listed channel. Failing channels are skipped; the request
    /// only fails when none succeed.
    async fn fetch_all(
        &self,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<RedditPost>, CoreError> {
        let mut tasks = JoinSet::new();
        for (index, subreddit) in self.config.allowed_subreddits.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let subreddit = subreddit.clone();
            tasks.spawn(
                async move {
                    let result = source.fetch_top_posts(&subreddit, limit, time_filter).await;
                    (index, subreddit, result)
                }
                .in_current_span(),
            );
        }

        let mut batches: Vec<(usize, Vec<RedditPost>)> = Vec::new();
        let mut last_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(posts))) => batches.push((index, posts)),
                Ok((_, subreddit, Err(e))) => {
                    warn!("Skipping r/{}: {}", subreddit, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Channel fetch task failed: {}", e);
                    last_error = Some(CoreError::internal(format!("fetch task failed: {}", e)));
                }
            }
        }

        if batches.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                CoreError::internal("no subreddits configured for fan-out")
            }));
        }

        batches.sort_by_key(|(index, _)| *index);
        Ok(batches.into_iter().flat_map(|(_, posts)| posts).collect())
    }

    async fn score(&self, params: &AnalyzeParams, records: Vec<PostRecord>) -> AnalysisResponse {
        let texts: Vec<String> = records.iter().map(|r| r.combined_text.clone()).collect();
        let report = self.scorer.score(&texts).await;

        let mut posts: Vec<_> = records
            .into_iter()
            .zip(report.scores)
            .map(|(record, scored)| record.into_output(scored.sentiment, scored.confidence))
            .collect();
        posts.sort_by(|a, b| b.reddit_score.cmp(&a.reddit_score));

        AnalysisResponse {
            query: params.query.clone(),
            subreddit: params.subreddit.clone(),
            time_filter: params.time_filter,
            counts: report.counts,
            posts,
        }
    }
}

/// Case-insensitive substring match on the combined text.
pub fn filter_by_query(records: Vec<PostRecord>, query: &str) -> Vec<PostRecord> {
    let needle = query.to_lowercase();
    records
        .into_iter()
        .filter(|record| record.combined_text.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, text: &str) -> PostRecord {
        PostRecord {
            post_id: id.to_string(),
            title: id.to_string(),
            combined_text: text.to_string(),
            url: String::new(),
            subreddit: "movies".to_string(),
            reddit_score: 1,
        }
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let records = vec![
            record("a", "A GREAT movie"),
            record("b", "meh"),
            record("c", "greatest ever"),
        ];
        let kept: Vec<String> = filter_by_query(records, "Great")
            .into_iter()
            .map(|r| r.post_id)
            .collect();
        assert_eq!(kept, vec!["a", "c"]);
    }

    #[test]
    fn test_cache_key_trims_subreddit() {
        let params = AnalyzeParams {
            query: "great".to_string(),
            subreddit: " movies ".to_string(),
            limit: 5,
            time_filter: TimeFilter::Week,
            include_comments: false,
        };
        assert_eq!(
            params.cache_key(),
            CacheKey::new("great", "movies", 5, TimeFilter::Week, false)
        );
    }
}
