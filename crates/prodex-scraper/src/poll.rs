//! Bounded polling shared by every wait point.
//!
//! Nothing in the extractor sleeps for a fixed time and hopes: each wait
//! re-checks a condition on an interval and gives up at a deadline or after an
//! attempt budget, returning `None` so the caller can degrade gracefully.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Polls `probe` until it yields `Some` or `timeout` elapses.
///
/// The probe runs immediately, then after every `interval`. The last probe
/// runs no later than `timeout` after the call.
pub async fn poll_until<T, F, Fut>(interval: Duration, timeout: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Polls `probe` at most `attempts` times, sleeping `interval` before each
/// attempt.
pub async fn poll_attempts<T, F, Fut>(attempts: u32, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..attempts {
        tokio::time::sleep(interval).await;
        if let Some(value) = probe().await {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn poll_until_returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = poll_until(Duration::from_millis(100), Duration::from_secs(2), || {
            let c = Arc::clone(&c);
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                (n == 3).then_some(n)
            }
        })
        .await;
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_gives_up_at_deadline() {
        let start = Instant::now();
        let result: Option<()> =
            poll_until(Duration::from_millis(100), Duration::from_millis(450), || async {
                None
            })
            .await;
        assert!(result.is_none());
        assert_eq!(start.elapsed(), Duration::from_millis(450));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_attempts_respects_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let start = Instant::now();
        let result: Option<()> = poll_attempts(10, Duration::from_millis(200), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                None
            }
        })
        .await;
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
