//! Resumable file transfers.
//!
//! # Features
//!
//! - Byte-range resume from `<file>.part` artifacts, measured on disk every attempt
//! - Atomic rename into place once a file is complete
//! - Per-transfer throughput ceiling ([`RateGovernor`])
//! - Exponential backoff with a longer fixed wait for HTTP 429 ([`RetryPolicy`])
//! - Per-host request spacing and `Retry-After` support ([`HostLimiter`])
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use albumdl_core::catalog::FileDescriptor;
//! use albumdl_core::download::{
//!     ClientSettings, HostLimiter, HttpClient, RetryPolicy, TransferEngine,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&ClientSettings::default())?;
//! let engine = TransferEngine::new(client, RetryPolicy::default(), Arc::new(HostLimiter::disabled()));
//! let file = FileDescriptor::new("abc", "photo.jpg", Some(1024), "https://pixeldrain.com/api/file/abc");
//! let outcome = engine.transfer(&file, Path::new("downloads/Album")).await;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod filename;
mod governor;
pub mod host_limiter;
mod retry;
mod state;

pub use client::{ClientSettings, ContentRange, HttpClient};
pub use engine::{TransferEngine, TransferOutcome};
pub use error::DownloadError;
pub use filename::{
    ALBUM_PLACEHOLDER, FILE_PLACEHOLDER, sanitize_album_name, sanitize_file_name, sanitize_name,
};
pub use governor::{GOVERNOR_WINDOW, RateGovernor};
pub use host_limiter::{HostLimiter, extract_host, parse_retry_after};
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use state::{TransferState, final_artifact_matches, known_size, partial_path_for};
