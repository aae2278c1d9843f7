//! Per-transfer throughput ceiling.
//!
//! The [`RateGovernor`] counts the bytes written inside a one-second window.
//! When the count passes the ceiling before the window closes, the caller is
//! suspended for the rest of the window and the counter starts over.
//!
//! One governor belongs to one transfer. N concurrent transfers may together
//! move up to N times the ceiling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Length of the accounting window.
pub const GOVERNOR_WINDOW: Duration = Duration::from_secs(1);

/// Average throughput ceiling for a single transfer.
#[derive(Debug)]
pub struct RateGovernor {
    /// Bytes per second; `0` disables the governor.
    ceiling: u64,
    window_start: Instant,
    bytes_in_window: u64,
}

impl RateGovernor {
    /// Creates a governor capped at `ceiling` bytes per second (`0` = unlimited).
    #[must_use]
    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            window_start: Instant::now(),
            bytes_in_window: 0,
        }
    }

    /// Creates a governor that never waits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Returns true when no ceiling is enforced.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.ceiling == 0
    }

    /// Returns the configured ceiling in bytes per second.
    #[must_use]
    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Accounts for `bytes` just written, sleeping if the window's budget is spent.
    ///
    /// Call once per chunk, before reading the next one.
    pub async fn throttle(&mut self, bytes: u64) {
        if self.ceiling == 0 {
            return;
        }

        if self.window_start.elapsed() >= GOVERNOR_WINDOW {
            self.reset();
        }

        self.bytes_in_window = self.bytes_in_window.saturating_add(bytes);
        if self.bytes_in_window <= self.ceiling {
            return;
        }

        let remaining = GOVERNOR_WINDOW.saturating_sub(self.window_start.elapsed());
        if !remaining.is_zero() {
            trace!(
                bytes = self.bytes_in_window,
                ceiling = self.ceiling,
                wait_ms = remaining.as_millis(),
                "throttling transfer"
            );
            tokio::time::sleep(remaining).await;
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.window_start = Instant::now();
        self.bytes_in_window = 0;
    }
}
