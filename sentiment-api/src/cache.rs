use lru::LruCache;
use sentiment_core::{AnalysisResponse, CacheConfig, TimeFilter};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Normalized `/analyze` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    include_comments: bool,
    limit: u32,
    query: String,
    subreddit: String,
    time_filter: TimeFilter,
}

impl CacheKey {
    pub fn new(
        query: &str,
        subreddit: &str,
        limit: u32,
        time_filter: TimeFilter,
        include_comments: bool,
    ) -> Self {
        Self {
            include_comments,
            limit,
            query: query.to_string(),
            subreddit: subreddit.trim().to_string(),
            time_filter,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analyze(include_comments={}, limit={}, query={:?}, subreddit={}, time_filter={})",
            self.include_comments, self.limit, self.query, self.subreddit, self.time_filter
        )
    }
}

struct CacheEntry {
    response: Arc<AnalysisResponse>,
    inserted_at: Instant,
}

/// Bounded, time-expiring memo of analysis responses.
pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A live entry for `key`. Expired entries are removed on the way.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<AnalysisResponse>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(Arc::clone(&entry.response));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("Cache entry expired: {}", key);
            entries.pop(key);
        }
        None
    }

    pub async fn insert(&self, key: CacheKey, response: Arc<AnalysisResponse>) {
        let mut entries = self.entries.lock().await;
        let entry = CacheEntry {
            response,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = entries.push(key, entry) {
            debug!("Displaced cache entry: {}", evicted);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
