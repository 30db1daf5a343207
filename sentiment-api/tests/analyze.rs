mod common;

use common::{harness, harness_with_ttl, movies_posts, post, FakeSource};
use sentiment_api::AnalyzeParams;
use sentiment_core::{CoreError, ErrorExt, RedditApiError, Sentiment, TimeFilter};
use std::sync::Arc;
use std::time::Duration;

fn params(query: &str, subreddit: &str, limit: u32) -> AnalyzeParams {
    AnalyzeParams {
        query: query.to_string(),
        subreddit: subreddit.to_string(),
        limit,
        time_filter: TimeFilter::All,
        include_comments: true,
    }
}

#[tokio::test]
async fn test_single_channel_query_is_filtered_scored_and_sorted() {
    let h = harness(FakeSource::default().with_posts("movies", movies_posts()));

    let response = h.analyzer.analyze(params("great", "movies", 5)).await.unwrap();

    assert_eq!(
        *h.source.requested_limits.lock().unwrap(),
        vec![("movies".to_string(), 5)]
    );
    let ids: Vec<&str> = response.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["m2", "m1", "m4"]);

    let scores: Vec<i64> = response.posts.iter().map(|p| p.reddit_score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    assert_eq!(response.counts.total(), response.posts.len());
    assert_eq!(response.counts.positive, 2);
    assert_eq!(response.counts.neutral, 1);
    assert_eq!(response.posts[0].sentiment, Sentiment::Neutral);
    assert!(response
        .posts
        .iter()
        .all(|p| (0.0..=1.0).contains(&p.confidence)));

    assert_eq!(response.query, "great");
    assert_eq!(response.subreddit, "movies");
    assert_eq!(response.time_filter, TimeFilter::All);
}

#[tokio::test]
async fn test_comments_feed_the_query_filter() {
    let source = FakeSource::default()
        .with_posts("movies", vec![post("movies", "c1", "Opening weekend", 10)])
        .with_comments("c1", &["The score was great"]);
    let h = harness(source);

    let with_comments = h.analyzer.analyze(params("great", "movies", 5)).await.unwrap();
    assert_eq!(with_comments.posts.len(), 1);

    let mut no_comments = params("great", "movies", 5);
    no_comments.include_comments = false;
    let calls_before = h.source.comment_calls();
    let without = h.analyzer.analyze(no_comments).await.unwrap();

    assert!(without.posts.is_empty());
    assert_eq!(h.source.comment_calls(), calls_before);
}

#[tokio::test]
async fn test_unknown_channel_is_rejected_before_fetching() {
    let h = harness(FakeSource::default().with_posts("movies", movies_posts()));

    let err = h
        .analyzer
        .analyze(params("great", "politics", 5))
        .await
        .unwrap_err();

    assert!(err.is_client_error());
    let message = err.user_friendly_message();
    assert!(message.contains("movies"));
    assert!(message.contains("TrueFilm"));
    assert!(message.contains("boxoffice"));
    assert_eq!(h.source.post_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_limit_and_blank_query_are_rejected() {
    let h = harness(FakeSource::default().with_posts("movies", movies_posts()));

    let too_many = h.analyzer.analyze(params("great", "movies", 51)).await;
    assert!(matches!(too_many, Err(CoreError::InvalidInput { .. })));

    let zero = h.analyzer.analyze(params("great", "movies", 0)).await;
    assert!(matches!(zero, Err(CoreError::InvalidInput { .. })));

    let blank = h.analyzer.analyze(params("   ", "movies", 5)).await;
    assert!(matches!(blank, Err(CoreError::InvalidInput { .. })));

    assert_eq!(h.source.post_calls(), 0);
}

#[tokio::test]
async fn test_channel_name_is_trimmed() {
    let h = harness(FakeSource::default().with_posts("movies", movies_posts()));
    let response = h.analyzer.analyze(params("great", "  movies ", 5)).await.unwrap();
    assert_eq!(response.subreddit, "movies");
}

#[tokio::test]
async fn test_identical_requests_hit_the_cache() {
    let h = harness(FakeSource::default().with_posts("movies", movies_posts()));

    let first = h.analyzer.analyze(params("great", "movies", 5)).await.unwrap();
    let second = h.analyzer.analyze(params("great", "movies", 5)).await.unwrap();

    assert_eq!(h.source.post_calls(), 1);
    assert_eq!(h.classifier.batches(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(
        serde_json::to_vec(first.as_ref()).unwrap(),
        serde_json::to_vec(second.as_ref()).unwrap()
    );

    // Any differing argument is a different entry.
    h.analyzer.analyze(params("great", "movies", 4)).await.unwrap();
    assert_eq!(h.source.post_calls(), 2);
}

#[tokio::test]
async fn test_expired_entry_triggers_fresh_fetch() {
    let h = harness_with_ttl(
        FakeSource::default().with_posts("movies", movies_posts()),
        Duration::from_millis(50),
    );

    h.analyzer.analyze(params("great", "movies", 5)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    h.analyzer.analyze(params("great", "movies", 5)).await.unwrap();

    assert_eq!(h.source.post_calls(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let h = harness(FakeSource::default());

    for _ in 0..2 {
        let err = h
            .analyzer
            .analyze(params("great", "movies", 5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::RedditApi(RedditApiError::SubredditNotFound { .. })
        ));
    }
    assert_eq!(h.source.post_calls(), 2);
}

#[tokio::test]
async fn test_fan_out_skips_failing_channel() {
    let source = FakeSource::default()
        .with_posts(
            "movies",
            vec![post("movies", "m1", "great film", 50), post("movies", "m2", "meh", 40)],
        )
        .with_posts("TrueFilm", vec![post("TrueFilm", "t1", "A great essay", 70)])
        .failing("boxoffice");
    let h = harness(source);

    let response = h.analyzer.analyze(params("great", "all", 10)).await.unwrap();

    assert_eq!(h.source.post_calls(), 3);
    assert_eq!(response.subreddit, "all");
    let ids: Vec<&str> = response.posts.iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "m1"]);
    assert_eq!(response.counts.total(), 2);
}

#[tokio::test]
async fn test_fan_out_fails_only_when_every_channel_fails() {
    let source = FakeSource::default()
        .failing("movies")
        .failing("TrueFilm")
        .failing("boxoffice");
    let h = harness(source);

    let err = h
        .analyzer
        .analyze(params("great", "all", 10))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::RedditApi(RedditApiError::Forbidden { .. })
    ));
    assert_eq!(h.source.post_calls(), 3);
}

#[tokio::test]
async fn test_no_matches_skips_the_classifier() {
    let h = harness(FakeSource::default().with_posts("movies", movies_posts()));

    let response = h
        .analyzer
        .analyze(params("zzz-nothing", "movies", 5))
        .await
        .unwrap();

    assert!(response.posts.is_empty());
    assert_eq!(response.counts.positive, 0);
    assert_eq!(response.counts.neutral, 0);
    assert_eq!(response.counts.negative, 0);
    assert_eq!(h.classifier.batches(), 0);
}
