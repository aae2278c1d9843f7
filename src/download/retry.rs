//! Retry classification and exponential backoff for failed transfer attempts.
//!
//! # Overview
//!
//! When an attempt fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - may succeed on retry (5xx, 403, transport errors)
//! - [`FailureType::RateLimited`] - host-side throttling (429), waits much longer
//! - [`FailureType::Permanent`] - retrying cannot help (404, local write errors)
//!
//! [`RetryPolicy::backoff`] is a pure function of failure type and attempt
//! number. Jitter is layered on top by [`RetryPolicy::should_retry`] and can be
//! switched off, so the schedule is testable without real time passing.
//!
//! # Example
//!
//! ```
//! use albumdl_core::download::{classify_error, DownloadError, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://example.com/a.jpg", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => println!("retry #{attempt} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::RATE_LIMITED_BACKOFF;

/// Default attempt budget per file (initial attempt included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry; doubles on every further attempt.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on a single exponential backoff.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Maximum jitter added to a computed delay.
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// The host asked us to slow down (HTTP 429).
    RateLimited,

    /// Retrying would not change the result.
    Permanent,
}

impl FailureType {
    /// Returns true for failures that go through the backoff-and-retry path.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Permanent)
    }
}

/// Decision on whether to make another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Number of the attempt about to be made (1-indexed).
        attempt: u32,
    },

    /// Stop and report the file as failed.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Attempt budget and backoff schedule.
///
/// Delays with the defaults: 2s, 4s, 8s, 16s for transient failures and a
/// flat 30s after a 429, each plus up to 500ms of jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    rate_limited_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            rate_limited_delay: RATE_LIMITED_BACKOFF,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom delays. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        rate_limited_delay: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            rate_limited_delay,
            jitter: true,
        }
    }

    /// Creates a default policy with a custom attempt budget.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Creates a policy that retries immediately, for tests and dry runs.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO, Duration::ZERO).without_jitter()
    }

    /// Disables random jitter.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Returns the attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retrying after `attempt` (1-indexed) failed, without jitter.
    ///
    /// Rate-limited failures wait a fixed, longer delay; everything else
    /// doubles from the base delay up to the cap.
    #[must_use]
    pub fn backoff(&self, failure_type: FailureType, attempt: u32) -> Duration {
        if failure_type == FailureType::RateLimited {
            return self.rate_limited_delay;
        }
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Decides whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if !failure_type.is_retryable() {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, "attempt budget exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.backoff(failure_type, attempt) + self.jitter();
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn jitter(&self) -> Duration {
        if !self.jitter {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER.as_millis() as u64);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a transfer error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 403, 408, 416, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | other HTTP 4xx | Permanent |
/// | Network, Timeout | Transient |
/// | Integrity, RangeMismatch | Transient |
/// | Io, InvalidUrl | Permanent |
///
/// 403 is retried because file hosts answer with it while throttling
/// anonymous downloads. 416 is retried because the engine discards or
/// finalizes the partial artifact before the next attempt.
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),
        DownloadError::Network { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::Integrity { .. }
        | DownloadError::RangeMismatch { .. } => FailureType::Transient,
        DownloadError::Io { .. } | DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        403 => FailureType::Transient,
        408 => FailureType::Transient,
        416 => FailureType::Transient,
        429 => FailureType::RateLimited,
        400..=499 => FailureType::Permanent,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}
