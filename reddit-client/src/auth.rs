//! Application-only OAuth2 for the Reddit API.
//!
//! Reddit issues bearer tokens for the `client_credentials` grant, authenticated with
//! HTTP basic auth. Tokens are cached and refreshed shortly before they expire.

use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use sentiment_core::{ConfigError, CoreError, RedditApiError};
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh this long before the token actually expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Reddit's documented lifetime for app-only tokens, used when `expires_in` is absent.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn needs_refresh(&self) -> bool {
        SystemTime::now() + REFRESH_MARGIN >= self.expires_at
    }

    fn from_response(response: &BasicTokenResponse) -> Self {
        let lifetime = response.expires_in().unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Self {
            access_token: response.access_token().secret().to_string(),
            expires_at: SystemTime::now() + lifetime,
            scope: response
                .scopes()
                .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
pub struct RedditAuthenticator {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    token: RwLock<Option<RedditToken>>,
}

impl RedditAuthenticator {
    pub fn new(
        client_id: String,
        client_secret: String,
        user_agent: &str,
    ) -> Result<Self, CoreError> {
        Self::with_token_url(client_id, client_secret, user_agent, REDDIT_TOKEN_URL)
    }

    pub fn with_token_url(
        client_id: String,
        client_secret: String,
        user_agent: &str,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let auth_url =
            AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| invalid_url("auth_url", e))?;
        let token_url =
            TokenUrl::new(token_url.to_string()).map_err(|e| invalid_url("token_url", e))?;

        let oauth_client = BasicClient::new(
            ClientId::new(client_id),
            Some(ClientSecret::new(client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::BasicAuth);

        // Token endpoints must not follow redirects.
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            oauth_client,
            http_client,
            token: RwLock::new(None),
        })
    }

    /// Returns a valid bearer token, requesting a new one when needed.
    pub async fn access_token(&self) -> Result<String, CoreError> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| !t.needs_refresh()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(token) = slot.as_ref().filter(|t| !t.needs_refresh()) {
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *slot = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        warn!("Discarding cached Reddit token");
        *self.token.write().await = None;
    }

    pub async fn current_token(&self) -> Option<RedditToken> {
        self.token.read().await.clone()
    }

    async fn request_token(&self) -> Result<RedditToken, CoreError> {
        debug!("Requesting app-only Reddit access token");

        let response = self
            .oauth_client
            .exchange_client_credentials()
            .request_async(|request| send_token_request(&self.http_client, request))
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => {
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: response.to_string(),
                    })
                }
                RequestTokenError::Request(err) => CoreError::Network(err),
                RequestTokenError::Parse(err, _) => {
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: format!("unreadable token response: {}", err),
                    })
                }
                RequestTokenError::Other(reason) => {
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
                }
            })?;

        let token = RedditToken::from_response(&response);
        info!(
            "Obtained Reddit access token (scopes: {:?}, valid for {:?})",
            token.scope,
            token
                .expires_at
                .duration_since(SystemTime::now())
                .unwrap_or_default()
        );
        Ok(token)
    }
}

async fn send_token_request(
    client: &reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().to_owned();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn invalid_url(field: &str, err: impl std::fmt::Display) -> CoreError {
    CoreError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: err.to_string(),
    })
}
