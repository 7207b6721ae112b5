//! Minimum spacing between requests issued through one client instance.
//!
//! Clones of a client share the same spacer, so a client shared by every
//! batch worker throttles all of them together.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct RequestSpacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Blocks until `min_interval` has elapsed since the previous request,
    /// then stamps the current time as the new last request.
    ///
    /// The lock is held while sleeping so concurrent callers queue up
    /// behind each other instead of all waking at the same deadline.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if now < ready_at {
                debug!(
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Spacing request"
                );
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Records the end of an attempt, successful or not.
    pub async fn mark(&self) {
        *self.last_request.lock().await = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let spacer = RequestSpacer::new(Duration::from_secs(5));
        let start = std::time::Instant::now();
        spacer.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sequential_requests_are_spaced() {
        let spacer = RequestSpacer::new(Duration::from_millis(50));
        let start = std::time::Instant::now();

        spacer.wait().await;
        spacer.wait().await;
        spacer.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_mark_pushes_next_request_back() {
        let spacer = RequestSpacer::new(Duration::from_millis(60));
        spacer.wait().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        spacer.mark().await;

        let start = std::time::Instant::now();
        spacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_spacing() {
        let spacer = Arc::new(RequestSpacer::new(Duration::from_millis(40)));
        let start = std::time::Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let spacer = spacer.clone();
                tokio::spawn(async move { spacer.wait().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // Four requests need three gaps.
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let spacer = RequestSpacer::new(Duration::ZERO);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            spacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
