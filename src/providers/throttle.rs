use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Spaces out consecutive requests by a fixed interval. The first request
/// goes out immediately.
pub struct RateLimiter {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        RateLimiter {
            interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until the interval since the previous request has passed, then
    /// records the current request.
    pub async fn wait(&self) {
        let mut last_request = self.last_request.lock().await;
        match *last_request {
            Some(previous) => {
                let ready_at = previous + self.interval;
                let now = Instant::now();
                if ready_at > now {
                    debug!(
                        wait_ms = (ready_at - now).as_millis() as u64,
                        "Waiting for rate limit"
                    );
                    tokio::time::sleep_until(ready_at).await;
                }
            }
            None => debug!("First request, skipping rate limit wait"),
        }
        *last_request = Some(Instant::now());
    }
}
