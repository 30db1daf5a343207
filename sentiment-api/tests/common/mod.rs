#![allow(dead_code)]

use async_trait::async_trait;
use reddit_client::{CommentsOutcome, PostSource};
use sentiment_api::{Analyzer, ResponseCache};
use sentiment_core::{AnalysisConfig, CoreError, RedditApiError, RedditPost, TimeFilter};
use sentiment_engine::{LexiconClassifier, RawPrediction, SentimentScorer, TextClassifier};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory forum with call counters.
#[derive(Default)]
pub struct FakeSource {
    pub posts: HashMap<String, Vec<RedditPost>>,
    pub comments: HashMap<String, Vec<String>>,
    pub failing: HashSet<String>,
    pub post_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
    pub requested_limits: Mutex<Vec<(String, u32)>>,
}

impl FakeSource {
    pub fn with_posts(mut self, subreddit: &str, posts: Vec<RedditPost>) -> Self {
        self.posts.insert(subreddit.to_string(), posts);
        self
    }

    pub fn with_comments(mut self, post_id: &str, bodies: &[&str]) -> Self {
        self.comments.insert(
            post_id.to_string(),
            bodies.iter().map(|b| b.to_string()).collect(),
        );
        self
    }

    pub fn failing(mut self, subreddit: &str) -> Self {
        self.failing.insert(subreddit.to_string());
        self
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for FakeSource {
    async fn fetch_top_posts(
        &self,
        subreddit: &str,
        limit: u32,
        time_filter: TimeFilter,
    ) -> Result<Vec<RedditPost>, CoreError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_limits
            .lock()
            .unwrap()
            .push((subreddit.to_string(), limit));

        if self.failing.contains(subreddit) {
            return Err(CoreError::RedditApi(RedditApiError::Forbidden {
                subreddit: subreddit.to_string(),
            }));
        }

        match self.posts.get(subreddit) {
            Some(posts) if !posts.is_empty() => {
                Ok(posts.iter().take(limit as usize).cloned().collect())
            }
            Some(_) => Err(CoreError::RedditApi(RedditApiError::NoPostsFound {
                subreddit: subreddit.to_string(),
                time_filter: time_filter.to_string(),
            })),
            None => Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            })),
        }
    }

    async fn fetch_top_comments(&self, post_id: &str, limit: usize) -> CommentsOutcome {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        match self.comments.get(post_id) {
            Some(bodies) => CommentsOutcome::Fetched(bodies.iter().take(limit).cloned().collect()),
            None => CommentsOutcome::Unavailable {
                reason: "no comments recorded".to_string(),
            },
        }
    }
}

/// Lexicon classifier that counts batches.
#[derive(Default)]
pub struct CountingClassifier {
    inner: LexiconClassifier,
    pub batches: AtomicUsize,
}

impl CountingClassifier {
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextClassifier for CountingClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<RawPrediction>, CoreError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.inner.classify_batch(texts).await
    }

    fn model_name(&self) -> &str {
        "counting-lexicon"
    }
}

pub fn post(subreddit: &str, id: &str, title: &str, score: i64) -> RedditPost {
    RedditPost {
        id: id.to_string(),
        title: title.to_string(),
        selftext: String::new(),
        permalink: format!("https://www.reddit.com/r/{}/comments/{}/", subreddit, id),
        subreddit: subreddit.to_string(),
        score,
    }
}

pub fn movies_posts() -> Vec<RedditPost> {
    vec![
        post("movies", "m1", "A great sequel", 120),
        post("movies", "m2", "Terrible pacing but great cast", 340),
        post("movies", "m3", "Box office numbers", 15),
        post("movies", "m4", "GREAT soundtrack, loved it", -4),
        post("movies", "m5", "Another thread", 80),
        post("movies", "m6", "great great great", 999),
    ]
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub classifier: Arc<CountingClassifier>,
    pub analyzer: Arc<Analyzer>,
}

pub fn harness(source: FakeSource) -> Harness {
    harness_with_ttl(source, Duration::from_secs(120))
}

pub fn harness_with_ttl(source: FakeSource, ttl: Duration) -> Harness {
    let source = Arc::new(source);
    let classifier = Arc::new(CountingClassifier::default());
    let scorer = Arc::new(SentimentScorer::new(classifier.clone(), 16, 512));
    let analyzer = Arc::new(Analyzer::new(
        source.clone(),
        scorer,
        ResponseCache::new(256, ttl),
        AnalysisConfig::default(),
    ));
    Harness {
        source,
        classifier,
        analyzer,
    }
}
