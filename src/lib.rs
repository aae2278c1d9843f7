//! Album Downloader Core Library
//!
//! Downloads whole albums from file-sharing hosts into one local directory
//! per album, with byte-range resume, per-transfer throughput limits and
//! retry with backoff.
//!
//! # Architecture
//!
//! - [`catalog`] - host-specific providers turning an album URL into a file list
//! - [`download`] - resumable, rate-governed single-file transfers
//! - [`scheduler`] - FIFO album queue with a bounded per-album worker pool
//! - [`archive`] - optional zip extraction after download
//! - [`progress`] - status and byte-progress hooks for a UI
//! - [`input`] - album URLs from arguments and list files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod catalog;
pub mod download;
pub mod input;
pub mod progress;
pub mod scheduler;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use archive::{ArchiveError, extract_zip};
pub use catalog::{
    Album, CatalogError, CatalogProvider, CatalogRegistry, FileDescriptor, PixeldrainProvider,
    build_default_registry,
};
pub use download::{
    ClientSettings, DownloadError, FailureType, HostLimiter, HttpClient, RateGovernor,
    RetryDecision, RetryPolicy, TransferEngine, TransferOutcome, classify_error,
};
pub use input::{InputError, UrlList, collect_urls};
pub use progress::{NoopProgress, ProgressReporter, StatusHook, silent_status_hook};
pub use scheduler::{
    AlbumResult, JobSender, QueueError, Scheduler, SchedulerConfig, SchedulerError,
    default_concurrency,
};
