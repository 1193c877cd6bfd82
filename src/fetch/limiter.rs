//! Global request pacing.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between outbound requests.
///
/// The pacing state is a single timestamp behind a mutex: whichever caller
/// holds the lock computes the remaining delay, sleeps it off, and stamps
/// the new time before releasing. Concurrent callers therefore queue up and
/// leave spaced exactly one period apart.
#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter for `rate` requests per second. The rate is
    /// validated as positive before core entry (see `config::validate`).
    pub fn new(rate: f64) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / rate),
            last_request: Mutex::new(None),
        }
    }

    /// Suspends until at least one period has elapsed since the previous
    /// call, then records the current time as the new reference point.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.period {
                tokio::time::sleep(self.period - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
