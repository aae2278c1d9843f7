//! Album scheduling: serial over albums, parallel within an album.
//!
//! # Overview
//!
//! - [`JobQueue`] / [`JobSender`] - FIFO intake of album URLs with a stop sentinel
//! - [`Scheduler`] - drains the queue one album at a time; each album's files
//!   fan out over a semaphore-bounded set of tokio tasks
//! - [`AlbumResult`] - per-album counts, emitted in submission order
//!
//! Catalog failures end only their own album; file failures end only their
//! own file. Nothing short of dropping the stream stops the queue.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use futures_util::StreamExt;
//! use albumdl_core::catalog::build_default_registry;
//! use albumdl_core::download::{ClientSettings, HostLimiter, HttpClient, RetryPolicy, TransferEngine};
//! use albumdl_core::scheduler::{Scheduler, SchedulerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&ClientSettings::default())?;
//! let registry = Arc::new(build_default_registry(&client));
//! let engine = TransferEngine::new(client, RetryPolicy::default(), Arc::new(HostLimiter::disabled()));
//! let scheduler = Scheduler::new(registry, engine, SchedulerConfig::new(PathBuf::from("downloads")))?;
//!
//! scheduler.submit("https://pixeldrain.com/l/abc123")?;
//! scheduler.shutdown();
//!
//! let results = scheduler.run();
//! futures_util::pin_mut!(results);
//! while let Some(result) = results.next().await {
//!     println!("{result}");
//! }
//! # Ok(())
//! # }
//! ```

mod queue;
mod result;

pub use queue::{AlbumJob, JobQueue, JobSender, QueueError};
pub use result::AlbumResult;

pub use crate::progress::StatusHook;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::Stream;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::archive;
use crate::catalog::{Album, CatalogRegistry};
use crate::download::{TransferEngine, TransferOutcome, final_artifact_matches};

/// Minimum allowed worker count.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed worker count.
pub const MAX_CONCURRENCY: usize = 32;

/// Default worker count: available parallelism clamped to 1..=4.
#[must_use]
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map_or(MIN_CONCURRENCY, std::num::NonZeroUsize::get)
        .clamp(MIN_CONCURRENCY, 4)
}

/// Errors raised while constructing a [`Scheduler`].
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Worker count outside the accepted range.
    #[error(
        "invalid concurrency value {value}: must be between {min} and {max}",
        min = MIN_CONCURRENCY,
        max = MAX_CONCURRENCY
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Root under which one directory per album is created.
    pub base_dir: PathBuf,
    /// Files transferred in parallel within one album.
    pub concurrency: usize,
    /// Extract `.zip` files downloaded in this run.
    pub extract_archives: bool,
}

impl SchedulerConfig {
    /// Settings with the default concurrency and extraction disabled.
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            concurrency: default_concurrency(),
            extract_archives: false,
        }
    }
}

/// Owns the job queue and the per-album worker pool.
#[derive(Debug)]
pub struct Scheduler {
    sender: JobSender,
    queue: JobQueue,
    worker: AlbumWorker,
}

#[derive(Debug)]
struct AlbumWorker {
    registry: Arc<CatalogRegistry>,
    engine: TransferEngine,
    config: SchedulerConfig,
    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    /// Creates a scheduler with an empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if `config.concurrency`
    /// is outside 1..=32.
    #[instrument(level = "debug", skip(registry, engine), fields(concurrency = config.concurrency))]
    pub fn new(
        registry: Arc<CatalogRegistry>,
        engine: TransferEngine,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&config.concurrency) {
            return Err(SchedulerError::InvalidConcurrency {
                value: config.concurrency,
            });
        }
        let (sender, queue) = JobQueue::new();
        Ok(Self {
            sender,
            queue,
            worker: AlbumWorker {
                semaphore: Arc::new(Semaphore::new(config.concurrency)),
                registry,
                engine,
                config,
            },
        })
    }

    /// Returns a handle that can submit jobs or stop the queue from elsewhere.
    #[must_use]
    pub fn handle(&self) -> JobSender {
        self.sender.clone()
    }

    /// Queues an album URL.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] after [`Scheduler::shutdown`].
    pub fn submit(&self, url: impl Into<String>) -> Result<(), QueueError> {
        let url = url.into();
        self.worker.status(&format!("queued {url}"));
        self.sender.submit(url)
    }

    /// Stops accepting jobs; queued jobs are still processed by [`Scheduler::run`].
    pub fn shutdown(&self) {
        self.sender.shutdown();
    }

    /// Processes queued albums one at a time, yielding each album's result in
    /// submission order.
    ///
    /// The stream ends at the stop sentinel, or when every [`JobSender`] from
    /// [`Scheduler::handle`] has been dropped.
    pub fn run(self) -> impl Stream<Item = AlbumResult> {
        let Self {
            sender,
            queue,
            worker,
        } = self;
        // Only external handles keep the queue open from here on.
        drop(sender);

        futures_util::stream::unfold((queue, worker), |(mut queue, worker)| async move {
            let job = queue.next().await?;
            let result = worker.process_album(&job.source_url).await;
            Some((result, (queue, worker)))
        })
    }

    /// Resolves and downloads one album immediately, bypassing the queue.
    pub async fn process_album(&self, url: &str) -> AlbumResult {
        self.worker.process_album(url).await
    }
}

impl AlbumWorker {
    fn status(&self, message: &str) {
        (self.engine.status_hook())(message);
    }

    #[instrument(skip(self), fields(album))]
    async fn process_album(&self, url: &str) -> AlbumResult {
        self.status(&format!("resolving {url}"));

        let album = match self.registry.resolve(url).await {
            Ok(album) => album,
            Err(error) => {
                warn!(error = %error, "album resolution failed");
                return self.report(AlbumResult::album_failure(url, error.reason()));
            }
        };
        tracing::Span::current().record("album", album.name.as_str());

        let dir = self.config.base_dir.join(&album.name);
        if let Err(error) = tokio::fs::create_dir_all(&dir).await {
            warn!(dir = %dir.display(), error = %error, "cannot create album directory");
            let mut result = AlbumResult::album_failure(
                url,
                format!("cannot create {}: {error}", dir.display()),
            );
            result.album = album.name;
            result.failed = album.files.len();
            return self.report(result);
        }

        for name in album.colliding_names() {
            warn!(file = name, "several files share this name; the last one written wins");
        }

        let mut result = AlbumResult::new(album.name.as_str(), url);

        if all_present(&album, &dir).await {
            info!(files = album.files.len(), "album already complete");
            result.skipped = album.files.len();
            return self.report(result);
        }

        self.status(&format!(
            "{}: downloading {} files",
            album.name,
            album.files.len()
        ));

        let mut handles = Vec::with_capacity(album.files.len());
        for file in album.files {
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                warn!(file = %file.name, "worker pool closed");
                result.record(TransferOutcome::Failed);
                continue;
            };
            let engine = self.engine.clone();
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = engine.transfer(&file, &dir).await;
                (file.name, outcome)
            }));
        }

        debug!(tasks = handles.len(), "waiting for album transfers");
        let mut downloaded_names = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((name, outcome)) => {
                    if outcome == TransferOutcome::Downloaded {
                        downloaded_names.push(name);
                    }
                    result.record(outcome);
                }
                Err(error) => {
                    warn!(error = %error, "transfer task panicked");
                    result.record(TransferOutcome::Failed);
                }
            }
        }

        if self.config.extract_archives {
            self.extract_archives(&dir, downloaded_names).await;
        }

        info!(
            downloaded = result.downloaded,
            skipped = result.skipped,
            failed = result.failed,
            "album complete"
        );
        self.report(result)
    }

    fn report(&self, result: AlbumResult) -> AlbumResult {
        self.status(&result.to_string());
        result
    }

    async fn extract_archives(&self, dir: &Path, names: Vec<String>) {
        for name in names {
            let archive_path = dir.join(&name);
            if !archive::is_zip(&archive_path) {
                continue;
            }
            let outcome =
                tokio::task::spawn_blocking(move || archive::extract_zip(&archive_path)).await;
            match outcome {
                Ok(Ok(target)) => self.status(&format!("extracted {name} to {}", target.display())),
                Ok(Err(error)) => {
                    warn!(file = %name, error = %error, "archive extraction failed");
                    self.status(&format!("extract failed for {name}: {error}"));
                }
                Err(error) => warn!(file = %name, error = %error, "extraction task panicked"),
            }
        }
    }
}

/// True when every file's final artifact already matches its expected size.
async fn all_present(album: &Album, dir: &Path) -> bool {
    for file in &album.files {
        if !final_artifact_matches(&dir.join(&file.name), file.expected_size).await {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_concurrency_in_range() {
        let value = default_concurrency();
        assert!((1..=4).contains(&value));
    }

    #[test]
    fn test_config_defaults() {
        let config = SchedulerConfig::new(PathBuf::from("downloads"));
        assert_eq!(config.base_dir, PathBuf::from("downloads"));
        assert!(!config.extract_archives);
        assert!((MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&config.concurrency));
    }

    #[test]
    fn test_invalid_concurrency_display() {
        let error = SchedulerError::InvalidConcurrency { value: 0 };
        assert!(error.to_string().contains("between 1 and 32"));
    }
}
