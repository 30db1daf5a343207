use futures::stream::{self, StreamExt};
use reddit_client::{CommentsOutcome, PostSource};
use sentiment_core::{clean_text, truncate_chars, AnalysisConfig, PostRecord, RedditPost};
use tracing::{debug, warn};

/// Comment lookups allowed in flight per dataset build.
const COMMENT_FETCH_CONCURRENCY: usize = 4;

/// Comments to fetch per post, shrinking as the batch grows.
pub fn effective_comment_budget(batch_len: usize, comment_limit: usize) -> usize {
    if comment_limit == 0 {
        return 0;
    }
    match batch_len {
        0..=10 => comment_limit,
        11..=25 => (comment_limit / 2).max(1),
        _ => (comment_limit / 4).max(1),
    }
}

/// Turns fetched posts into analysis records.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    comment_limit: usize,
    text_truncate: usize,
}

impl DatasetBuilder {
    pub fn new(comment_limit: usize, text_truncate: usize) -> Self {
        Self {
            comment_limit,
            text_truncate,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.comment_limit, config.text_truncate)
    }

    /// One record per post, in input order. Comment failures only empty that post's
    /// comment text.
    pub async fn build(
        &self,
        source: &dyn PostSource,
        posts: Vec<RedditPost>,
        include_comments: bool,
    ) -> Vec<PostRecord> {
        let budget = if include_comments {
            effective_comment_budget(posts.len(), self.comment_limit)
        } else {
            0
        };
        debug!(posts = posts.len(), include_comments, budget, "Building dataset");

        stream::iter(posts)
            .map(|post| async move {
                let comments = if budget > 0 {
                    match source.fetch_top_comments(&post.id, budget).await {
                        CommentsOutcome::Fetched(bodies) => bodies,
                        CommentsOutcome::Unavailable { reason } => {
                            warn!(post_id = %post.id, "Continuing without comments: {}", reason);
                            Vec::new()
                        }
                    }
                } else {
                    Vec::new()
                };
                self.record(post, &comments)
            })
            .buffered(COMMENT_FETCH_CONCURRENCY)
            .collect()
            .await
    }

    pub fn record(&self, post: RedditPost, comments: &[String]) -> PostRecord {
        let combined = [
            post.title.as_str(),
            post.selftext.trim(),
            comments.join(" ").as_str(),
        ]
        .join(" ");
        let cleaned = clean_text(&combined);

        PostRecord {
            combined_text: truncate_chars(&cleaned, self.text_truncate).to_string(),
            post_id: post.id,
            title: post.title,
            url: post.permalink,
            subreddit: post.subreddit,
            reddit_score: post.score,
        }
    }
}
