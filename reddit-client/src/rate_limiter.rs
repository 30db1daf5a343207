//! Client-side throttling for the Reddit API.
//!
//! Two limits apply: a local token bucket sized for Reddit's published OAuth budget,
//! and the server's own accounting from the `x-ratelimit-*` response headers. When the
//! server reports the window as spent, permits are held back until it resets.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub time_window: Duration,
    pub burst_allowance: u32,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            max_requests: 100,
            time_window: Duration::from_secs(60),
            burst_allowance: 10,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

impl TokenBucket {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_allowance as f64;
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_per_sec: config.max_requests as f64 / config.time_window.as_secs_f64(),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let earned = now.duration_since(state.last_refill).as_secs_f64() * self.refill_per_sec;
        state.tokens = (state.tokens + earned).min(self.capacity);
        state.last_refill = now;
    }

    /// Take one token, or report how long until one is available.
    pub async fn try_take(&self) -> Result<(), Duration> {
        let mut state = self.state.lock().await;
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64(
                (1.0 - state.tokens) / self.refill_per_sec,
            ))
        }
    }

    pub async fn available(&self) -> f64 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens
    }
}

/// What the last response said about the server-side window.
#[derive(Debug, Clone, Copy)]
struct ServerWindow {
    remaining: f64,
    resets_at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    bucket: TokenBucket,
    in_flight: Arc<Semaphore>,
    server_window: Mutex<Option<ServerWindow>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            in_flight: Arc::new(Semaphore::new(config.burst_allowance as usize)),
            bucket: TokenBucket::new(&config),
            server_window: Mutex::new(None),
        }
    }

    pub async fn acquire_permit(&self) -> RateLimitPermit {
        let started = Instant::now();
        // Only fails if the semaphore is closed, which never happens here.
        let permit = self.in_flight.clone().acquire_owned().await.ok();

        if let Some(pause) = self.server_pause().await {
            warn!("Reddit reports the rate window spent, pausing {:?}", pause);
            sleep(pause).await;
        }

        while let Err(wait) = self.bucket.try_take().await {
            debug!("Local rate budget exhausted, waiting {:?}", wait);
            sleep(wait).await;
        }

        RateLimitPermit {
            _permit: permit,
            queue_wait_time: started.elapsed(),
        }
    }

    /// Record `x-ratelimit-remaining` / `x-ratelimit-reset` from a response.
    pub async fn record_server_window(&self, remaining: Option<f64>, reset_secs: Option<u64>) {
        let (Some(remaining), Some(reset_secs)) = (remaining, reset_secs) else {
            return;
        };
        *self.server_window.lock().await = Some(ServerWindow {
            remaining,
            resets_at: Instant::now() + Duration::from_secs(reset_secs),
        });
    }

    /// Time left before the server window reopens, if it is currently spent.
    pub async fn server_pause(&self) -> Option<Duration> {
        let window = (*self.server_window.lock().await)?;
        if window.remaining >= 1.0 {
            return None;
        }
        let left = window.resets_at.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }

    pub async fn available_tokens(&self) -> u32 {
        self.bucket.available().await as u32
    }

    pub fn available_permits(&self) -> usize {
        self.in_flight.available_permits()
    }
}

#[derive(Debug)]
pub struct RateLimitPermit {
    _permit: Option<OwnedSemaphorePermit>,
    pub queue_wait_time: Duration,
}
