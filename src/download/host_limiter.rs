//! Per-host request spacing shared by all workers.
//!
//! [`HostLimiter`] keeps a minimum gap between consecutive requests to the
//! same host. Requests to different hosts never wait on each other. A server
//! `Retry-After` pushes the host's next slot further out for every worker.
//!
//! ```
//! use std::time::Duration;
//! use albumdl_core::download::HostLimiter;
//!
//! # async fn example() {
//! let limiter = HostLimiter::new(Duration::from_millis(300));
//! limiter.acquire("https://pixeldrain.com/api/file/a").await;
//! limiter.acquire("https://pixeldrain.com/api/file/b").await; // waits ~300ms
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Minimum spacing between requests to the same host.
#[derive(Debug)]
pub struct HostLimiter {
    spacing: Duration,
    // Arc so the DashMap shard guard is dropped before awaiting the inner mutex.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// Earliest instant the next request may start; `None` before the first request.
    next_slot: Mutex<Option<Instant>>,
    cumulative_wait_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            next_slot: Mutex::new(None),
            cumulative_wait_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_wait(&self, wait: Duration) -> Duration {
        let wait_ms = wait.as_millis() as u64;
        let total = self.cumulative_wait_ms.fetch_add(wait_ms, Ordering::SeqCst) + wait_ms;
        Duration::from_millis(total)
    }
}

impl HostLimiter {
    /// Creates a limiter enforcing `spacing` between requests to one host.
    ///
    /// A zero spacing still honors server-mandated delays.
    #[must_use]
    #[instrument(skip_all, fields(spacing_ms = spacing.as_millis()))]
    pub fn new(spacing: Duration) -> Self {
        debug!("creating host limiter");
        Self {
            spacing,
            hosts: DashMap::new(),
        }
    }

    /// Creates a limiter with no spacing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the configured spacing.
    #[must_use]
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    fn state_for(&self, host: &str) -> Arc<HostState> {
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone()
    }

    /// Waits until a request to `url`'s host may start, then books the next slot.
    ///
    /// The first request to a host proceeds immediately.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        let host = extract_host(url);
        tracing::Span::current().record("host", host.as_str());
        let state = self.state_for(&host);

        // Book the slot under the lock, then wait without it.
        let slot = {
            let mut next_slot = state.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |booked| booked.max(now));
            *next_slot = Some(slot + self.spacing);
            slot
        };

        let now = Instant::now();
        if slot > now {
            let wait = slot - now;
            let cumulative = state.add_wait(wait);
            debug!(
                host = %host,
                delay_ms = wait.as_millis(),
                cumulative_ms = cumulative.as_millis(),
                "spacing request"
            );
            if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                warn!(
                    host = %host,
                    cumulative_delay_secs = cumulative.as_secs(),
                    "requests to this host are heavily throttled"
                );
            }
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Holds back every worker's next request to `url`'s host for `delay`.
    ///
    /// Used when a server answers 429 with `Retry-After`.
    #[instrument(skip(self), fields(host))]
    pub async fn record_server_delay(&self, url: &str, delay: Duration) {
        let host = extract_host(url);
        tracing::Span::current().record("host", host.as_str());
        let state = self.state_for(&host);

        let candidate = Instant::now() + delay;
        let mut next_slot = state.next_slot.lock().await;
        if next_slot.is_none_or(|slot| slot < candidate) {
            *next_slot = Some(candidate);
        }
        debug!(host = %host, delay_ms = delay.as_millis(), "recorded server delay");
    }
}

/// Extracts the lowercase host from a URL, or `"unknown"` if there is none.
///
/// ```
/// use albumdl_core::download::host_limiter::extract_host;
///
/// assert_eq!(extract_host("https://PixelDrain.com/l/abc"), "pixeldrain.com");
/// assert_eq!(extract_host("http://127.0.0.1:8080/x"), "127.0.0.1");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a `Retry-After` value (integer seconds or HTTP-date).
///
/// Values above one hour are capped; dates in the past yield zero.
///
/// ```
/// use std::time::Duration;
/// use albumdl_core::download::host_limiter::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        let Ok(seconds) = u64::try_from(seconds) else {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        };
        return Some(cap_retry_after(Duration::from_secs(seconds)));
    }

    match httpdate::parse_http_date(header_value) {
        Ok(when) => Some(
            when.duration_since(std::time::SystemTime::now())
                .map_or(Duration::ZERO, cap_retry_after),
        ),
        Err(_) => {
            debug!(header_value, "unparseable Retry-After value");
            None
        }
    }
}

fn cap_retry_after(delay: Duration) -> Duration {
    if delay > MAX_RETRY_AFTER {
        warn!(
            delay_secs = delay.as_secs(),
            max_secs = MAX_RETRY_AFTER.as_secs(),
            "Retry-After exceeds maximum, capping"
        );
        MAX_RETRY_AFTER
    } else {
        delay
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_immediate() {
        let limiter = HostLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire("https://pixeldrain.com/api/file/a").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_host_is_spaced() {
        let limiter = HostLimiter::new(Duration::from_millis(300));
        let start = Instant::now();

        limiter.acquire("https://pixeldrain.com/api/file/a").await;
        limiter.acquire("https://pixeldrain.com/api/file/b").await;
        assert_eq!(start.elapsed(), Duration::from_millis(300));

        limiter.acquire("https://pixeldrain.com/api/file/c").await;
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_hosts_are_independent() {
        let limiter = HostLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        limiter.acquire("https://a.example/1").await;
        limiter.acquire("https://b.example/1").await;
        limiter.acquire("https://c.example/1").await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_waits() {
        let limiter = HostLimiter::disabled();
        let start = Instant::now();
        for i in 0..10 {
            limiter.acquire(&format!("https://a.example/{i}")).await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_delay_holds_back_next_request() {
        let limiter = HostLimiter::disabled();
        let start = Instant::now();

        limiter
            .record_server_delay("https://a.example/1", Duration::from_secs(5))
            .await;
        limiter.acquire("https://a.example/2").await;

        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_delay_never_shortens_existing_slot() {
        let limiter = HostLimiter::new(Duration::from_secs(10));
        let start = Instant::now();

        limiter.acquire("https://a.example/1").await;
        limiter
            .record_server_delay("https://a.example/1", Duration::from_secs(1))
            .await;
        limiter.acquire("https://a.example/2").await;

        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_request_does_not_block_server_delay() {
        let limiter = Arc::new(HostLimiter::new(Duration::from_secs(60)));
        limiter.acquire("https://a.example/1").await;

        let waiting = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire("https://a.example/2").await })
        };
        // Let the spawned request book its slot and start sleeping.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let start = Instant::now();
        limiter
            .record_server_delay("https://a.example/3", Duration::from_secs(1))
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!waiting.is_finished());

        waiting.await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_get_consecutive_slots() {
        let limiter = Arc::new(HostLimiter::new(Duration::from_millis(300)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire(&format!("https://a.example/{i}")).await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap() - start);
        }
        finished.sort();
        assert_eq!(
            finished,
            vec![
                Duration::ZERO,
                Duration::from_millis(300),
                Duration::from_millis(600)
            ]
        );
    }

    #[test]
    fn test_cumulative_wait_tracking() {
        let state = HostState::new();
        state.add_wait(Duration::from_secs(5));
        assert_eq!(state.add_wait(Duration::from_secs(10)), Duration::from_secs(15));
    }

    #[test]
    fn test_extract_host_variants() {
        assert_eq!(extract_host("https://pixeldrain.com/l/abc"), "pixeldrain.com");
        assert_eq!(extract_host("https://Example.COM:8443/x"), "example.com");
        assert_eq!(extract_host(""), "unknown");
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("  45 "), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_parse_retry_after_rejects_negative_and_garbage() {
        assert_eq!(parse_retry_after("-5"), None);
        assert_eq!(parse_retry_after(""), None);
        assert_eq!(parse_retry_after("later"), None);
    }

    #[test]
    fn test_parse_retry_after_caps_at_one_hour() {
        assert_eq!(parse_retry_after("7200"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_parse_retry_after_http_dates() {
        assert_eq!(
            parse_retry_after("Wed, 01 Jan 2020 00:00:00 GMT"),
            Some(Duration::ZERO)
        );

        let future = std::time::SystemTime::now() + Duration::from_secs(60);
        let delay = parse_retry_after(&httpdate::fmt_http_date(future)).unwrap();
        assert!(delay >= Duration::from_secs(55) && delay <= Duration::from_secs(61));
    }
}
