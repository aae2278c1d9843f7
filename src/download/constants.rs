//! Constants for the download module (timeouts, resume markers, backoff).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (60 seconds per request).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Suffix appended to the final path while a transfer is in progress.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Default per-transfer throughput ceiling (512 KiB/s).
pub const DEFAULT_SPEED_LIMIT_BYTES: u64 = 512 * 1024;

/// Default spacing between consecutive requests to the same host.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(300);

/// Fixed wait after an HTTP 429 without a usable Retry-After header.
pub const RATE_LIMITED_BACKOFF: Duration = Duration::from_secs(30);

/// Maximum Retry-After value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Warning threshold for cumulative request spacing per host (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);
