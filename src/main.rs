use anyhow::Result;
use reddit_client::RedditClient;
use sentiment_api::{build_router, Analyzer, AppState, ResponseCache};
use sentiment_core::{AppConfig, ServerConfig};
use sentiment_engine::{build_classifier, SentimentScorer};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Library modules held at `warn` unless `RUST_LOG` says otherwise.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls", "tower_http"];

fn init_logging(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = server.log_level.clone();
        for module in NOISY_MODULES {
            directives.push_str(&format!(",{}=warn", module));
        }
        EnvFilter::new(directives)
    });

    let registry = tracing_subscriber::registry().with(filter);
    if server.log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let startup = std::time::Instant::now();

    let config = AppConfig::load()?;
    init_logging(&config.server);

    tracing::info!("Starting Reddit Movie Sentiment v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Configuration: {:?}", config);

    let reddit = Arc::new(RedditClient::new(&config.reddit)?);

    let classifier = build_classifier(&config.sentiment)?;
    let scorer = Arc::new(SentimentScorer::from_config(classifier, &config.sentiment));
    scorer.warm_up().await;

    let analyzer = Arc::new(Analyzer::new(
        reddit,
        scorer,
        ResponseCache::from_config(&config.cache),
        config.analysis.clone(),
    ));
    tracing::info!(
        ttl_secs = analyzer.cache().ttl().as_secs(),
        max_entries = config.cache.max_entries,
        "Response cache ready"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(AppState::new(analyzer))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!(
        duration_ms = startup.elapsed().as_millis() as u64,
        "Service initialized"
    );
    tracing::info!("Listening on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
