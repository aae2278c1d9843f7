//! Presentation boundary: byte-level progress and human-readable status lines.
//!
//! The core never renders anything. A UI subscribes through a
//! [`ProgressReporter`] for per-file byte counts and a [`StatusHook`] for
//! one-line messages (retries, outcomes, album summaries).

use std::sync::Arc;

use crate::download::TransferOutcome;

/// Callback receiving human-readable status lines.
pub type StatusHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Returns a hook that discards every message.
#[must_use]
pub fn silent_status_hook() -> StatusHook {
    Arc::new(|_: &str| {})
}

/// Receives per-file transfer progress. All methods default to no-ops.
///
/// Implementations are shared across workers and must be cheap; they run on
/// the transfer's task between chunk writes.
pub trait ProgressReporter: Send + Sync {
    /// A transfer is about to fetch `file`, resuming from `resumed_from` bytes.
    fn file_started(&self, file: &str, resumed_from: u64, total: Option<u64>) {
        let _ = (file, resumed_from, total);
    }

    /// `bytes` more bytes of `file` reached the partial artifact.
    fn bytes_written(&self, file: &str, bytes: u64) {
        let _ = (file, bytes);
    }

    /// `file` reached a terminal outcome.
    fn file_finished(&self, file: &str, outcome: TransferOutcome) {
        let _ = (file, outcome);
    }
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {}
