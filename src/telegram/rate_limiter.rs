//! Outbound pacing for Bot API calls.
//!
//! Keeps a minimum gap between consecutive calls and, after a 429 answer,
//! holds every caller back until the server's `retry_after` has passed.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Window {
    /// When the last call was let through.
    last_call: Option<Instant>,

    /// Nothing may pass before this instant (set by flood waits).
    blocked_until: Option<Instant>,
}

/// Rate limiter that enforces minimum intervals between API calls.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            window: Mutex::new(Window::default()),
        }
    }

    /// Creates a rate limiter from milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Waits until a call is allowed, then marks it as performed.
    ///
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn acquire(&self) -> Duration {
        let mut window = self.window.lock().await;
        let now = Instant::now();

        let mut ready_at = window
            .last_call
            .map_or(now, |last| last + self.min_interval);
        if let Some(blocked) = window.blocked_until {
            ready_at = ready_at.max(blocked);
        }

        let wait = ready_at.saturating_duration_since(now);
        if !wait.is_zero() {
            debug!("Rate limiter: waiting {:?} before next call", wait);
            tokio::time::sleep(wait).await;
        }

        window.last_call = Some(Instant::now());
        window.blocked_until = None;
        wait
    }

    /// Records a flood-wait answer; the next [`acquire`](Self::acquire) sleeps it out.
    pub async fn flood_wait(&self, retry_after_secs: u32) {
        warn!("Received flood wait from Telegram: {} seconds", retry_after_secs);
        let until = Instant::now() + Duration::from_secs(u64::from(retry_after_secs));
        let mut window = self.window.lock().await;
        window.blocked_until = Some(window.blocked_until.map_or(until, |b| b.max(until)));
    }

    /// Returns the time remaining until the next call is allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        let window = self.window.lock().await;
        let now = Instant::now();
        let by_interval = window
            .last_call
            .map_or(now, |last| last + self.min_interval);
        let ready_at = window.blocked_until.map_or(by_interval, |b| b.max(by_interval));
        ready_at.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_is_free() {
        let limiter = RateLimiter::from_millis(500);
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_call_waits_for_interval() {
        let limiter = RateLimiter::from_millis(100);
        limiter.acquire().await;

        assert!(limiter.time_until_allowed().await > Duration::ZERO);
        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flood_wait_blocks_next_call() {
        let limiter = RateLimiter::from_millis(10);
        limiter.flood_wait(3).await;

        assert_eq!(limiter.time_until_allowed().await, Duration::from_secs(3));
        let waited = limiter.acquire().await;
        assert_eq!(waited, Duration::from_secs(3));
        assert!(limiter.time_until_allowed().await <= Duration::from_millis(10));
    }
}
