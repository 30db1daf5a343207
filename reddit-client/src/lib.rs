pub mod api;
pub mod auth;
pub mod rate_limiter;


use api::RedditApiClient;
use async_trait::async_trait;
use auth::RedditAuthenticator;
use sentiment_core::{CoreError, RedditApiError, RedditConfig, RedditPost, TimeFilter};
use std::future::Future;
use tracing::{debug, info, warn};

/// Result of a best-effort comment lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentsOutcome {
    Fetched(Vec<String>),
    /// Comments could not be read (deleted post, rate limiting, ...). Analysis of the
    /// post continues without them.
    Unavailable { reason: String },
}

impl CommentsOutcome {
    pub fn into_bodies(self) -> Vec<String> {
        match self {
            CommentsOutcome::Fetched(bodies) => bodies,
            CommentsOutcome::Unavailable { .. } => Vec::new(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CommentsOutcome::Unavailable { .. })
    }
}

/// Where posts and comments come from.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Top posts for `subreddit` in the given window, in the service's ranking order.
    async fn fetch_top_posts(
        &self,
        subreddit: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<RedditPost>, CoreError>;

    /// Up to `limit` top-level comment bodies. Never fails.
    async fn fetch_top_comments(&self, post_id: &str, limit: usize) -> CommentsOutcome;
}

#[derive(Debug)]
pub struct RedditClient {
    api: RedditApiClient,
    auth: RedditAuthenticator,
}

impl RedditClient {
    pub fn new(config: &RedditConfig) -> Result<Self, CoreError> {
        Self::with_endpoints(config, api::REDDIT_API_BASE, auth::REDDIT_TOKEN_URL)
    }

    pub fn with_endpoints(
        config: &RedditConfig,
        api_base: &str,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let api = RedditApiClient::with_base_url(config.user_agent.clone(), api_base)?;
        let auth = RedditAuthenticator::with_token_url(
            config.client_id.clone(),
            config.client_secret.clone(),
            &config.user_agent,
            token_url,
        )?;
        Ok(Self { api, auth })
    }

    pub fn api(&self) -> &RedditApiClient {
        &self.api
    }

    pub fn authenticator(&self) -> &RedditAuthenticator {
        &self.auth
    }

    /// Run `operation` with a bearer token. A rejected token is discarded and the
    /// operation is repeated once with a fresh one.
    async fn with_token<T, F, Fut>(&self, operation: F) -> Result<T, CoreError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.auth.access_token().await?;
        match operation(token).await {
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                self.auth.invalidate().await;
                let token = self.auth.access_token().await?;
                operation(token).await.map_err(|e| match e {
                    CoreError::RedditApi(RedditApiError::InvalidToken) => {
                        CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                            reason: "Reddit rejected a freshly issued token".to_string(),
                        })
                    }
                    other => other,
                })
            }
            other => other,
        }
    }
}

#[async_trait]
impl PostSource for RedditClient {
    async fn fetch_top_posts(
        &self,
        subreddit: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<RedditPost>, CoreError> {
        let api = &self.api;

        let about = self
            .with_token(move |token| async move { api.get_subreddit_info(&token, subreddit).await })
            .await?;
        debug!("Subreddit r/{} is accessible", about.display_name);

        let posts = self
            .with_token(move |token| async move {
                api.get_top_posts(&token, subreddit, time_filter, limit)
                    .await
            })
            .await?;

        if posts.is_empty() {
            return Err(CoreError::RedditApi(RedditApiError::NoPostsFound {
                subreddit: subreddit.to_string(),
                time_filter: time_filter.to_string(),
            }));
        }

        info!(
            subreddit,
            count = posts.len(),
            time_filter = %time_filter,
            "Fetched top posts"
        );
        Ok(posts.into_iter().map(RedditPost::from).collect())
    }

    async fn fetch_top_comments(&self, post_id: &str, limit: usize) -> CommentsOutcome {
        if limit == 0 {
            return CommentsOutcome::Fetched(Vec::new());
        }

        let api = &self.api;
        match self
            .with_token(move |token| async move { api.get_top_comments(&token, post_id, limit).await })
            .await
        {
            Ok(bodies) => CommentsOutcome::Fetched(bodies),
            Err(e) => {
                warn!("Comments unavailable for post {}: {}", post_id, e);
                CommentsOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
