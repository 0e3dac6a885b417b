//! Request pacing for the remote services
//!
//! Each client owns one limiter. Consecutive requests are spaced by at least
//! `min_interval`, plus a random jitter so a batch does not hit the service on
//! a fixed beat.

use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
    max_jitter: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64, max_jitter_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
            max_jitter: Duration::from_millis(max_jitter_ms),
        }
    }

    /// Wait if necessary to comply with the interval
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let required = self.min_interval + self.jitter();
            let elapsed = last_time.elapsed();
            if elapsed < required {
                let wait_time = required - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
        }
    }
}
