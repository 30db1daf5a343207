//! Process configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file named by
//! `APP_CONFIG_FILE`, then environment variables. Lookups go through a closure so the
//! same code path serves the real environment and tests.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE_VAR: &str = "APP_CONFIG_FILE";

#[derive(Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub allowed_subreddits: Vec<String>,
    pub default_subreddit: String,
    pub post_limit_default: u32,
    pub post_limit_max: u32,
    pub comment_limit: usize,
    pub text_truncate: usize,
    pub include_comments_default: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            allowed_subreddits: vec![
                "movies".to_string(),
                "TrueFilm".to_string(),
                "boxoffice".to_string(),
            ],
            default_subreddit: "movies".to_string(),
            post_limit_default: 40,
            post_limit_max: 50,
            comment_limit: 20,
            text_truncate: 512,
            include_comments_default: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBackend {
    HuggingFace,
    Lexicon,
}

impl FromStr for SentimentBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(SentimentBackend::HuggingFace),
            "lexicon" => Ok(SentimentBackend::Lexicon),
            other => Err(ConfigError::InvalidValue {
                field: "SENTIMENT_BACKEND".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct SentimentConfig {
    pub backend: SentimentBackend,
    pub model: String,
    pub inference_url: String,
    pub api_token: Option<String>,
    pub batch_size: usize,
    pub max_input_chars: usize,
}

impl fmt::Debug for SentimentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentimentConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("inference_url", &self.inference_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("batch_size", &self.batch_size)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            backend: SentimentBackend::HuggingFace,
            model: "distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            inference_url: "https://router.huggingface.co/hf-inference/models".to_string(),
            api_token: None,
            batch_size: 16,
            max_input_chars: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(120),
            max_entries: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub log_level: String,
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    pub analysis: AnalysisConfig,
    pub sentiment: SentimentConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    reddit: FileReddit,
    analysis: FileAnalysis,
    sentiment: FileSentiment,
    cache: FileCache,
    server: FileServer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileReddit {
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileAnalysis {
    allowed_subreddits: Option<Vec<String>>,
    default_subreddit: Option<String>,
    post_limit_default: Option<u32>,
    post_limit_max: Option<u32>,
    comment_limit: Option<usize>,
    text_truncate: Option<usize>,
    include_comments_default: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSentiment {
    backend: Option<SentimentBackend>,
    model: Option<String>,
    inference_url: Option<String>,
    api_token: Option<String>,
    batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileCache {
    ttl_seconds: Option<u64>,
    max_entries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileServer {
    bind_addr: Option<String>,
    log_level: Option<String>,
    log_format: Option<String>,
}

impl AppConfig {
    /// Load from `.env`, the optional config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup(CONFIG_FILE_VAR) {
            Some(path) if !path.trim().is_empty() => read_file_config(Path::new(path.trim()))?,
            _ => FileConfig::default(),
        };
        Self::build(file, &lookup)
    }

    fn build<F>(file: FileConfig, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = env("REDDIT_CLIENT_ID")
            .or(file.reddit.client_id)
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: "REDDIT_CLIENT_ID".to_string(),
            })?;
        let client_secret = env("REDDIT_CLIENT_SECRET")
            .or(file.reddit.client_secret)
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: "REDDIT_CLIENT_SECRET".to_string(),
            })?;
        let user_agent = env("REDDIT_USER_AGENT")
            .or(file.reddit.user_agent)
            .unwrap_or_else(|| "reddit-movie-sentiment".to_string());

        let defaults = AnalysisConfig::default();
        let allowed_subreddits = match env("ALLOWED_SUBREDDITS") {
            Some(raw) => split_list(&raw),
            None => file
                .analysis
                .allowed_subreddits
                .unwrap_or(defaults.allowed_subreddits),
        };
        let analysis = AnalysisConfig {
            allowed_subreddits,
            default_subreddit: env("DEFAULT_SUBREDDIT")
                .or(file.analysis.default_subreddit)
                .unwrap_or(defaults.default_subreddit),
            post_limit_default: parse_or(
                env("POST_LIMIT_DEFAULT"),
                "POST_LIMIT_DEFAULT",
                file.analysis.post_limit_default,
                defaults.post_limit_default,
            )?,
            post_limit_max: parse_or(
                env("POST_LIMIT_MAX"),
                "POST_LIMIT_MAX",
                file.analysis.post_limit_max,
                defaults.post_limit_max,
            )?,
            comment_limit: parse_or(
                env("COMMENT_LIMIT"),
                "COMMENT_LIMIT",
                file.analysis.comment_limit,
                defaults.comment_limit,
            )?,
            text_truncate: parse_or(
                env("TEXT_TRUNCATE"),
                "TEXT_TRUNCATE",
                file.analysis.text_truncate,
                defaults.text_truncate,
            )?,
            include_comments_default: parse_or(
                env("INCLUDE_COMMENTS_DEFAULT"),
                "INCLUDE_COMMENTS_DEFAULT",
                file.analysis.include_comments_default,
                defaults.include_comments_default,
            )?,
        };

        let sentiment_defaults = SentimentConfig::default();
        let backend = match env("SENTIMENT_BACKEND") {
            Some(raw) => raw.parse()?,
            None => file.sentiment.backend.unwrap_or(sentiment_defaults.backend),
        };
        let sentiment = SentimentConfig {
            backend,
            model: env("SENTIMENT_MODEL")
                .or(file.sentiment.model)
                .unwrap_or(sentiment_defaults.model),
            inference_url: env("SENTIMENT_INFERENCE_URL")
                .or(file.sentiment.inference_url)
                .unwrap_or(sentiment_defaults.inference_url),
            api_token: env("HF_API_TOKEN").or(file.sentiment.api_token),
            batch_size: parse_or(
                env("SENTIMENT_BATCH_SIZE"),
                "SENTIMENT_BATCH_SIZE",
                file.sentiment.batch_size,
                sentiment_defaults.batch_size,
            )?,
            max_input_chars: sentiment_defaults.max_input_chars,
        };

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            ttl: Duration::from_secs(parse_or(
                env("CACHE_TTL_SECONDS"),
                "CACHE_TTL_SECONDS",
                file.cache.ttl_seconds,
                cache_defaults.ttl.as_secs(),
            )?),
            max_entries: parse_or(
                env("CACHE_MAX_ENTRIES"),
                "CACHE_MAX_ENTRIES",
                file.cache.max_entries,
                cache_defaults.max_entries,
            )?,
        };

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            bind_addr: env("BIND_ADDR")
                .or(file.server.bind_addr)
                .unwrap_or(server_defaults.bind_addr),
            log_level: env("LOG_LEVEL")
                .or(file.server.log_level)
                .unwrap_or(server_defaults.log_level),
            log_format: env("LOG_FORMAT")
                .or(file.server.log_format)
                .unwrap_or(server_defaults.log_format),
        };

        let config = Self {
            reddit: RedditConfig {
                client_id,
                client_secret,
                user_agent,
            },
            analysis,
            sentiment,
            cache,
            server,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if analysis.allowed_subreddits.is_empty() {
            return Err(validation("ALLOWED_SUBREDDITS must name at least one subreddit"));
        }
        if analysis
            .allowed_subreddits
            .iter()
            .any(|name| name.eq_ignore_ascii_case("all"))
        {
            return Err(validation("ALLOWED_SUBREDDITS must not contain the reserved name 'all'"));
        }
        if !analysis
            .allowed_subreddits
            .contains(&analysis.default_subreddit)
        {
            return Err(validation(format!(
                "DEFAULT_SUBREDDIT '{}' is not in ALLOWED_SUBREDDITS {:?}",
                analysis.default_subreddit, analysis.allowed_subreddits
            )));
        }
        if analysis.post_limit_default == 0 || analysis.post_limit_default > analysis.post_limit_max
        {
            return Err(validation(format!(
                "POST_LIMIT_DEFAULT must be between 1 and POST_LIMIT_MAX ({})",
                analysis.post_limit_max
            )));
        }
        if analysis.text_truncate == 0 {
            return Err(validation("TEXT_TRUNCATE must be greater than zero"));
        }
        if self.sentiment.batch_size == 0 {
            return Err(validation("SENTIMENT_BATCH_SIZE must be greater than zero"));
        }
        if self.cache.max_entries == 0 {
            return Err(validation("CACHE_MAX_ENTRIES must be greater than zero"));
        }
        Ok(())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.display().to_string(),
    })?;
    Ok(toml::from_str(&raw)?)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T: FromStr>(
    raw: Option<String>,
    field: &str,
    from_file: Option<T>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field: field.to_string(),
                value,
            }),
        None => Ok(from_file.unwrap_or(default)),
    }
}

fn validation(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationFailed {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![
            ("REDDIT_CLIENT_ID", "id"),
            ("REDDIT_CLIENT_SECRET", "secret"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&credentials())).unwrap();

        assert_eq!(config.reddit.user_agent, "reddit-movie-sentiment");
        assert_eq!(
            config.analysis.allowed_subreddits,
            vec!["movies", "TrueFilm", "boxoffice"]
        );
        assert_eq!(config.analysis.default_subreddit, "movies");
        assert_eq!(config.analysis.post_limit_default, 40);
        assert_eq!(config.analysis.post_limit_max, 50);
        assert_eq!(config.analysis.comment_limit, 20);
        assert_eq!(config.analysis.text_truncate, 512);
        assert!(config.analysis.include_comments_default);
        assert_eq!(config.cache.ttl, Duration::from_secs(120));
        assert_eq!(config.cache.max_entries, 256);
        assert_eq!(config.sentiment.backend, SentimentBackend::HuggingFace);
        assert_eq!(config.sentiment.batch_size, 16);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_credentials() {
        let err = AppConfig::from_lookup(lookup_from(&[("REDDIT_CLIENT_ID", "id")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvironmentVariable { ref var_name } if var_name == "REDDIT_CLIENT_SECRET"
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let mut pairs = credentials();
        pairs.extend([
            ("ALLOWED_SUBREDDITS", "movies, horror ,"),
            ("POST_LIMIT_DEFAULT", "10"),
            ("CACHE_TTL_SECONDS", "5"),
            ("SENTIMENT_BACKEND", "lexicon"),
            ("INCLUDE_COMMENTS_DEFAULT", "false"),
        ]);
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.analysis.allowed_subreddits, vec!["movies", "horror"]);
        assert_eq!(config.analysis.post_limit_default, 10);
        assert_eq!(config.cache.ttl, Duration::from_secs(5));
        assert_eq!(config.sentiment.backend, SentimentBackend::Lexicon);
        assert!(!config.analysis.include_comments_default);
    }

    #[test]
    fn test_invalid_number() {
        let mut pairs = credentials();
        pairs.push(("POST_LIMIT_MAX", "lots"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "POST_LIMIT_MAX"));
    }

    #[test]
    fn test_validation_rejects_default_outside_allow_list() {
        let mut pairs = credentials();
        pairs.push(("DEFAULT_SUBREDDIT", "pics"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }

    #[test]
    fn test_validation_rejects_default_limit_above_max() {
        let mut pairs = credentials();
        pairs.extend([("POST_LIMIT_DEFAULT", "60"), ("POST_LIMIT_MAX", "50")]);
        assert!(AppConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_file_layer_under_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[reddit]
client_id = "file-id"
client_secret = "file-secret"

[analysis]
allowed_subreddits = ["movies", "criterion"]
comment_limit = 8

[cache]
ttl_seconds = 30
"#
        )
        .unwrap();

        let path = file.path().display().to_string();
        let config = AppConfig::from_lookup(lookup_from(&[
            (CONFIG_FILE_VAR, path.as_str()),
            ("REDDIT_CLIENT_ID", "env-id"),
            ("COMMENT_LIMIT", "3"),
        ]))
        .unwrap();

        assert_eq!(config.reddit.client_id, "env-id");
        assert_eq!(config.reddit.client_secret, "file-secret");
        assert_eq!(config.analysis.allowed_subreddits, vec!["movies", "criterion"]);
        assert_eq!(config.analysis.comment_limit, 3);
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_config_file() {
        let mut pairs = credentials();
        pairs.push((CONFIG_FILE_VAR, "/definitely/not/here.toml"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup_from(&credentials())).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}
