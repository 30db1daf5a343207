use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode};
use sentiment_core::{CoreError, RedditApiError, RedditPost, TimeFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    pub permalink: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub stickied: bool,
}

/// Comment fields we read. "load more" stubs share the listing but carry no body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditCommentData {
    pub id: Option<String>,
    pub body: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub display_name: String,
    #[serde(default)]
    pub subreddit_type: Option<String>,
    #[serde(default)]
    pub subscribers: Option<u64>,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
    api_base: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE)
    }

    pub fn with_base_url(user_agent: String, api_base: &str) -> Result<Self, CoreError> {
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth()));

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter,
            user_agent,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Issue an authenticated request. `resource` names the subreddit or post the
    /// endpoint is about and is used in error messages.
    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        resource: &str,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.api_base, endpoint);

        let permit = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, permit.queue_wait_time
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let headers = response.headers();
        let remaining = header_value::<f64>(headers, "x-ratelimit-remaining");
        let reset = header_value::<u64>(headers, "x-ratelimit-reset");
        self.rate_limiter.record_server_window(remaining, reset).await;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        warn!("Request failed with status: {} for {}", status, endpoint);
        let error = match status {
            StatusCode::TOO_MANY_REQUESTS => RedditApiError::RateLimitExceeded {
                retry_after: header_value::<u64>(response.headers(), "retry-after")
                    .or(reset)
                    .unwrap_or(60),
            },
            StatusCode::UNAUTHORIZED => RedditApiError::InvalidToken,
            StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                subreddit: resource.to_string(),
            },
            StatusCode::NOT_FOUND => RedditApiError::SubredditNotFound {
                subreddit: resource.to_string(),
            },
            status if status.is_server_error() => RedditApiError::ServerError {
                status_code: status.as_u16(),
            },
            status => RedditApiError::InvalidResponse {
                details: format!("unexpected status {} for {}", status, endpoint),
            },
        };
        Err(CoreError::RedditApi(error))
    }

    /// Look up a subreddit, which also verifies that it exists and is readable.
    pub async fn get_subreddit_info(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<RedditSubredditData, CoreError> {
        let endpoint = format!("/r/{}/about", subreddit);

        let response = self
            .make_request(Method::GET, &endpoint, access_token, None, subreddit)
            .await?;

        // Unknown names can come back as a search listing instead of a t5 "thing".
        let value: serde_json::Value = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit info: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse info for r/{}", subreddit),
            })
        })?;

        if value.get("kind").and_then(|k| k.as_str()) != Some("t5") {
            return Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            }));
        }

        let info: RedditListingChild<RedditSubredditData> = serde_json::from_value(value)?;
        debug!("Retrieved info for r/{}", info.data.display_name);
        Ok(info.data)
    }

    pub async fn get_top_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        time_filter: TimeFilter,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/top", subreddit);
        let limit_str = limit.to_string();
        let params = [("t", time_filter.as_str()), ("limit", limit_str.as_str())];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params[..]), subreddit)
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        let posts: Vec<RedditPostData> = listing
            .data
            .children
            .into_iter()
            .filter(|child| child.kind == "t3")
            .map(|child| child.data)
            .take(limit as usize)
            .collect();

        info!("Retrieved {} top posts from r/{}", posts.len(), subreddit);
        Ok(posts)
    }

    /// Up to `limit` top-level comment bodies for a post, in listing order.
    pub async fn get_top_comments(
        &self,
        access_token: &str,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let limit_str = limit.to_string();
        let params = [
            ("depth", "1"),
            ("limit", limit_str.as_str()),
            ("sort", "top"),
        ];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params[..]), post_id)
            .await?;

        // The endpoint answers with [post listing, comment listing].
        let listings: Vec<RedditListing<RedditCommentData>> =
            response.json().await.map_err(|e| {
                error!("Failed to parse comments for {}: {}", post_id, e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse comments for post {}", post_id),
                })
            })?;

        let bodies: Vec<String> = listings
            .into_iter()
            .nth(1)
            .map(|listing| listing.data.children)
            .unwrap_or_default()
            .into_iter()
            .filter(|child| child.kind == "t1")
            .filter_map(|child| child.data.body)
            .take(limit)
            .collect();

        debug!("Retrieved {} comments for post {}", bodies.len(), post_id);
        Ok(bodies)
    }

    pub async fn available_tokens(&self) -> u32 {
        self.rate_limiter.available_tokens().await
    }

    /// How long Reddit has asked us to hold off, if at all.
    pub async fn server_pause(&self) -> Option<Duration> {
        self.rate_limiter.server_pause().await
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<T>().ok())
}

pub fn absolute_permalink(permalink: &str) -> String {
    Url::parse(REDDIT_WEB_BASE)
        .and_then(|base| base.join(permalink))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("{}{}", REDDIT_WEB_BASE, permalink))
}

impl From<RedditPostData> for RedditPost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            permalink: absolute_permalink(&post_data.permalink),
            id: post_data.id,
            title: post_data.title,
            selftext: post_data.selftext,
            subreddit: post_data.subreddit,
            score: post_data.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> RedditPostData {
        RedditPostData {
            id: "test123".to_string(),
            title: "Test Post".to_string(),
            selftext: "This is test content".to_string(),
            author: Some("test_user".to_string()),
            subreddit: "movies".to_string(),
            permalink: "/r/movies/comments/test123/test_post/".to_string(),
            url: None,
            score: 42,
            num_comments: 5,
            created_utc: 1640995200.0,
            stickied: false,
        }
    }

    #[tokio::test]
    async fn test_api_client_creation() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");
        assert!(client.available_tokens().await > 0);
    }

    #[test]
    fn test_reddit_post_conversion() {
        let reddit_post: RedditPost = sample_post().into();
        assert_eq!(reddit_post.id, "test123");
        assert_eq!(reddit_post.title, "Test Post");
        assert_eq!(reddit_post.selftext, "This is test content");
        assert_eq!(reddit_post.score, 42);
        assert_eq!(
            reddit_post.permalink,
            "https://www.reddit.com/r/movies/comments/test123/test_post/"
        );
    }

    #[test]
    fn test_post_data_tolerates_missing_optional_fields() {
        let raw = r#"{"id": "x1", "subreddit": "TrueFilm", "permalink": "/r/TrueFilm/comments/x1/"}"#;
        let post: RedditPostData = serde_json::from_str(raw).unwrap();
        assert_eq!(post.title, "");
        assert_eq!(post.score, 0);
    }

    #[test]
    fn test_comment_stub_deserializes_without_body() {
        let raw = r#"{"kind": "more", "data": {"count": 12, "children": ["a", "b"]}}"#;
        let child: RedditListingChild<RedditCommentData> = serde_json::from_str(raw).unwrap();
        assert_eq!(child.kind, "more");
        assert!(child.data.body.is_none());
    }
}
