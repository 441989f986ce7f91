//! Caller-side politeness and retry utilities.
//!
//! The fetcher itself never sleeps or retries. Orchestrators wrap fetches in
//! [`RetailerThrottle::wait_turn`] to honour per-retailer request delays and
//! in [`retry_with_backoff`] to retry transient failures.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use kibble_core::RetailerCatalog;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::FetchError;

/// Spaces out requests to the same retailer.
///
/// Each retailer gets its own slot; concurrent callers for one retailer queue
/// behind each other while other retailers proceed independently.
#[derive(Debug)]
pub struct RetailerThrottle {
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl RetailerThrottle {
    #[must_use]
    pub fn new(default_delay: Duration) -> Self {
        Self {
            delays: HashMap::new(),
            default_delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Delays taken from the catalog's `request_delay_ms`, falling back to
    /// `default_delay_ms`.
    #[must_use]
    pub fn from_catalog(catalog: &RetailerCatalog, default_delay_ms: u64) -> Self {
        let delays = catalog
            .retailer_slugs()
            .into_iter()
            .map(|slug| {
                let delay = catalog.request_delay(&slug, default_delay_ms);
                (slug, delay)
            })
            .collect();
        Self {
            delays,
            default_delay: Duration::from_millis(default_delay_ms),
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn delay_for(&self, retailer_slug: &str) -> Duration {
        self.delays
            .get(retailer_slug)
            .copied()
            .unwrap_or(self.default_delay)
    }

    /// Waits until `retailer_slug` may be requested again and reserves the
    /// following slot.
    pub async fn wait_turn(&self, retailer_slug: &str) {
        let delay = self.delay_for(retailer_slug);
        let ready_at = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let ready_at = slots
                .get(retailer_slug)
                .copied()
                .filter(|slot| *slot > now)
                .unwrap_or(now);
            slots.insert(retailer_slug.to_owned(), ready_at + delay);
            ready_at
        };
        if ready_at > Instant::now() {
            tracing::debug!(
                retailer = retailer_slug,
                wait_ms = u64::try_from(ready_at.saturating_duration_since(Instant::now()).as_millis())
                    .unwrap_or(u64::MAX),
                "throttling request"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }
}

/// Executes `operation`, retrying transient [`FetchError`]s with exponential
/// backoff and jitter.
///
/// The delay before retry `n` (0-based) is `backoff_base_ms * 2^n` plus up to
/// 25% random jitter. Errors for which [`FetchError::is_transient`] is false
/// are returned immediately. With `max_retries = 2` the operation runs at most
/// three times.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_transient() || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_ms, attempt);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            url = %err.url,
            error = %err.cause,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(20));
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jitter_ms = (exp_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
    Duration::from_millis(exp_ms.saturating_add(jitter_ms))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::FetchCause;

    fn status_error(status: u16) -> FetchError {
        FetchError::new("https://shop.test/p/1", FetchCause::Status { status })
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, FetchError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(status_error(503))
                } else {
                    Ok::<&str, FetchError>("<html></html>")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "<html></html>");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), FetchError>(status_error(429))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().status(), Some(429));
    }

    #[tokio::test]
    async fn does_not_retry_permanent_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), FetchError>(status_error(404))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().status(), Some(404));
    }

    #[test]
    fn backoff_grows_exponentially_with_bounded_jitter() {
        for attempt in 0..4 {
            let delay = backoff_delay(100, attempt).as_millis();
            let floor = 100u128 << attempt;
            assert!(delay >= floor, "attempt {attempt}: {delay} < {floor}");
            assert!(delay <= floor + floor / 4, "attempt {attempt}: {delay}");
        }
    }

    #[tokio::test]
    async fn throttle_spaces_requests_per_retailer() {
        let throttle = RetailerThrottle::new(Duration::from_millis(60));
        let start = Instant::now();
        throttle.wait_turn("zooplus").await;
        throttle.wait_turn("zooplus").await;
        throttle.wait_turn("zooplus").await;
        assert!(start.elapsed() >= Duration::from_millis(120));

        let other = Instant::now();
        throttle.wait_turn("tesco").await;
        assert!(other.elapsed() < Duration::from_millis(60));
    }

    #[test]
    fn throttle_uses_catalog_delays() {
        let catalog = RetailerCatalog::from_yaml_str(
            "retailers:\n  - name: Zooplus\n    request_delay_ms: 2000\n  - name: Jollyes\n",
        )
        .unwrap();
        let throttle = RetailerThrottle::from_catalog(&catalog, 750);
        assert_eq!(throttle.delay_for("zooplus"), Duration::from_millis(2000));
        assert_eq!(throttle.delay_for("jollyes"), Duration::from_millis(750));
        assert_eq!(throttle.delay_for("unknown"), Duration::from_millis(750));
    }
}
