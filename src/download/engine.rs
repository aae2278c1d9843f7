//! Transfer engine: one file's resumable, rate-governed download.
//!
//! [`TransferEngine::transfer`] drives a [`FileDescriptor`] to exactly one
//! [`TransferOutcome`]:
//!
//! 1. final artifact present with the expected size → `Skipped`, no network
//! 2. otherwise a bounded retry loop; every attempt re-measures the partial
//!    artifact on disk, fetches from that offset, appends chunk by chunk
//!    through the [`RateGovernor`], then renames the partial into place
//! 3. attempt budget exhausted or a permanent error → `Failed`, partial kept
//!
//! The engine keeps no per-file state between calls; everything it needs is
//! re-derived from the filesystem, so repeated calls are idempotent.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::Response;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use super::client::{ContentRange, content_length, content_range};
use super::governor::RateGovernor;
use super::host_limiter::{HostLimiter, parse_retry_after};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use super::state::{TransferState, final_artifact_matches};
use super::{DownloadError, HttpClient};
use crate::catalog::FileDescriptor;
use crate::progress::{NoopProgress, ProgressReporter, StatusHook, silent_status_hook};

/// Terminal result of one file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferOutcome {
    /// The final artifact already existed with the expected size.
    Skipped,
    /// The file was completed during this call.
    Downloaded,
    /// Retries were exhausted or a permanent error occurred.
    Failed,
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Skipped => "skipped",
            Self::Downloaded => "downloaded",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Downloads single files. Cheap to clone; clones share the HTTP pool,
/// host limiter, progress reporter and status hook.
#[derive(Clone)]
pub struct TransferEngine {
    client: HttpClient,
    retry_policy: RetryPolicy,
    host_limiter: Arc<HostLimiter>,
    speed_limit: u64,
    progress: Arc<dyn ProgressReporter>,
    status: StatusHook,
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEngine")
            .field("retry_policy", &self.retry_policy)
            .field("host_limiter", &self.host_limiter)
            .field("speed_limit", &self.speed_limit)
            .finish_non_exhaustive()
    }
}

impl TransferEngine {
    /// Creates an engine with no speed limit, no progress reporting and a
    /// silent status hook.
    #[must_use]
    pub fn new(client: HttpClient, retry_policy: RetryPolicy, host_limiter: Arc<HostLimiter>) -> Self {
        Self {
            client,
            retry_policy,
            host_limiter,
            speed_limit: 0,
            progress: Arc::new(NoopProgress),
            status: silent_status_hook(),
        }
    }

    /// Caps each transfer at `bytes_per_sec` (`0` = unlimited).
    #[must_use]
    pub fn with_speed_limit(mut self, bytes_per_sec: u64) -> Self {
        self.speed_limit = bytes_per_sec;
        self
    }

    /// Routes byte-level progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Routes retry and outcome messages to `status`.
    #[must_use]
    pub fn with_status_hook(mut self, status: StatusHook) -> Self {
        self.status = status;
        self
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the status hook shared with the scheduler.
    #[must_use]
    pub fn status_hook(&self) -> &StatusHook {
        &self.status
    }

    /// Downloads `descriptor` into `destination_dir`.
    ///
    /// Never returns an error: every failure ends as [`TransferOutcome::Failed`]
    /// with the partial artifact left on disk for a later resume.
    #[instrument(skip(self, descriptor), fields(file = %descriptor.name, url = %descriptor.locator))]
    pub async fn transfer(&self, descriptor: &FileDescriptor, destination_dir: &Path) -> TransferOutcome {
        let final_path = destination_dir.join(&descriptor.name);

        if final_artifact_matches(&final_path, descriptor.expected_size).await {
            debug!("final artifact present, skipping");
            return self.finish(descriptor, TransferOutcome::Skipped);
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, "starting attempt");

            let error = match self.attempt(descriptor, &final_path).await {
                Ok(()) => return self.finish(descriptor, TransferOutcome::Downloaded),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            let server_delay = if failure_type == FailureType::RateLimited {
                self.server_delay(&error, &descriptor.locator).await
            } else {
                None
            };

            match self.retry_policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay: backoff,
                    attempt: next_attempt,
                } => {
                    let delay = server_delay.unwrap_or(backoff);
                    info!(
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        using_retry_after = server_delay.is_some(),
                        error = %error,
                        "retrying transfer"
                    );
                    (self.status)(&format!(
                        "retry {next_attempt}/{} for {} in {}s ({error})",
                        self.retry_policy.max_attempts(),
                        descriptor.name,
                        delay.as_secs()
                    ));
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(attempts = attempt, error = %error, %reason, "transfer failed");
                    (self.status)(&format!("failed {}: {error}", descriptor.name));
                    return self.finish(descriptor, TransferOutcome::Failed);
                }
            }
        }
    }

    fn finish(&self, descriptor: &FileDescriptor, outcome: TransferOutcome) -> TransferOutcome {
        self.progress.file_finished(&descriptor.name, outcome);
        outcome
    }

    /// Parses `Retry-After` from a 429 and shares it with every worker on that host.
    async fn server_delay(&self, error: &DownloadError, url: &str) -> Option<std::time::Duration> {
        let DownloadError::HttpStatus {
            retry_after: Some(header),
            ..
        } = error
        else {
            return None;
        };
        let delay = parse_retry_after(header)?;
        self.host_limiter.record_server_delay(url, delay).await;
        Some(delay)
    }

    /// One fetch-and-stream attempt. State is rebuilt from disk every time.
    async fn attempt(&self, descriptor: &FileDescriptor, final_path: &Path) -> Result<(), DownloadError> {
        let mut state = TransferState::load(final_path.to_path_buf(), descriptor.expected_size).await?;

        if state.partial_overshoots() {
            state.discard_partial().await?;
        }
        if state.bytes_confirmed() > 0 && state.partial_is_complete() {
            debug!("partial artifact already complete, finalizing");
            state.finalize().await?;
            return Ok(());
        }

        self.host_limiter.acquire(&descriptor.locator).await;

        let offset = state.resume_offset();
        let response = match self.client.fetch(&descriptor.locator, offset).await {
            Ok(response) => response,
            Err(error) if offset > 0 && error.status() == Some(416) => {
                return recover_unsatisfiable(state, error).await;
            }
            Err(error) => return Err(error),
        };

        let append = check_resume(&mut state, &response, &descriptor.locator)?;
        self.progress
            .file_started(&descriptor.name, state.bytes_confirmed(), state.target_size());

        let mut file = open_partial(state.partial_path(), append).await?;
        let streamed = self
            .stream_body(response, &mut file, &mut state, &descriptor.name)
            .await;
        // Flush even on failure so the next attempt measures everything received.
        let flushed = file
            .flush()
            .await
            .map_err(|e| DownloadError::io(state.partial_path(), e));
        drop(file);
        streamed?;
        flushed?;

        if let Some(target) = state.target_size()
            && state.bytes_confirmed() != target
        {
            return Err(DownloadError::integrity(
                state.partial_path(),
                target,
                state.bytes_confirmed(),
            ));
        }

        let path = state.finalize().await?;
        debug!(path = %path.display(), "transfer complete");
        Ok(())
    }

    async fn stream_body(
        &self,
        response: Response,
        file: &mut File,
        state: &mut TransferState,
        name: &str,
    ) -> Result<(), DownloadError> {
        let url = response.url().to_string();
        let mut governor = RateGovernor::new(self.speed_limit);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url.as_str())
                } else {
                    DownloadError::network(url.as_str(), e)
                }
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(state.partial_path(), e))?;

            let written = chunk.len() as u64;
            state.record_written(written);
            self.progress.bytes_written(name, written);
            governor.throttle(written).await;
        }
        Ok(())
    }
}

/// Decides between appending and restarting, and learns the total size.
fn check_resume(
    state: &mut TransferState,
    response: &Response,
    url: &str,
) -> Result<bool, DownloadError> {
    let offset = state.resume_offset();
    let status = response.status().as_u16();
    let length = content_length(response);

    if offset > 0 && status == 206 {
        let raw = content_range(response).unwrap_or_default();
        let range = ContentRange::parse(&raw);
        if range.and_then(|r| r.start) != Some(offset) {
            return Err(DownloadError::range_mismatch(url, offset, raw));
        }
        let total = range
            .and_then(|r| r.total)
            .or_else(|| length.map(|remaining| offset.saturating_add(remaining)));
        state.learn_target_size(total);
        debug!(offset, total = ?total, "resuming partial artifact");
        return Ok(true);
    }

    if offset > 0 {
        warn!(offset, status, "server ignored range request, restarting from zero");
        state.restart();
    }
    state.learn_target_size(length);
    Ok(false)
}

async fn open_partial(path: &Path, append: bool) -> Result<File, DownloadError> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path).await.map_err(|e| DownloadError::io(path, e))
}

/// Handles a 416 to a ranged request using `Content-Range: bytes */N`.
///
/// N equal to the partial size means the partial is already complete. Any
/// other answer means the partial cannot be trusted and is discarded; the
/// original error is returned so the retry loop starts over from zero.
async fn recover_unsatisfiable(
    mut state: TransferState,
    error: DownloadError,
) -> Result<(), DownloadError> {
    let total = match &error {
        DownloadError::HttpStatus {
            content_range: Some(raw),
            ..
        } => ContentRange::parse(raw).and_then(|r| r.total),
        _ => None,
    };

    if total == Some(state.bytes_confirmed()) {
        debug!(bytes = state.bytes_confirmed(), "server reports partial complete");
        state.learn_target_size(total);
        state.finalize().await?;
        return Ok(());
    }

    state.discard_partial().await?;
    Err(error)
}
