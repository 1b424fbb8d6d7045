use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes outbound dispatch across concurrent callers: any two `wait()`
/// grants are at least `min_interval` apart, system-wide. This is a spacing
/// gate around a single "last dispatch" instant, not a concurrency limiter.
pub struct Pacer {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub fn from_millis(min_interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_interval_ms))
    }

    /// Blocks until `min_interval` has elapsed since the most recently
    /// granted wait. The lock is held across the sleep so grants are
    /// serialized; tokio's mutex queues waiters, so none starves.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_dispatch.lock().await;
        let now = Instant::now();
        let release_at = match *last {
            Some(prev) => std::cmp::max(prev + self.min_interval, now),
            None => now,
        };
        tokio::time::sleep_until(release_at).await;
        // Record the grant instant before releasing the next waiter.
        *last = Some(release_at);
    }
}
