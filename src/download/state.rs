//! On-disk transfer state for a single file.
//!
//! A [`TransferState`] is rebuilt from the filesystem at the start of every
//! attempt. The partial artifact's real size is the only source of truth for
//! the resume offset; nothing is cached between attempts or runs.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use super::DownloadError;
use super::constants::PARTIAL_SUFFIX;

/// Returns the partial artifact path for `final_path` (`<final>.part`).
#[must_use]
pub fn partial_path_for(final_path: &Path) -> PathBuf {
    let mut raw: OsString = final_path.as_os_str().to_owned();
    raw.push(PARTIAL_SUFFIX);
    PathBuf::from(raw)
}

/// Treats a zero size as "unknown", matching catalogs that report `0` when
/// they do not know the size upfront.
#[must_use]
pub fn known_size(size: Option<u64>) -> Option<u64> {
    size.filter(|&bytes| bytes > 0)
}

/// Returns true when the final artifact exists and matches `expected_size`.
///
/// With an unknown expected size, existence alone counts as complete.
pub async fn final_artifact_matches(final_path: &Path, expected_size: Option<u64>) -> bool {
    match tokio::fs::metadata(final_path).await {
        Ok(meta) if meta.is_file() => match known_size(expected_size) {
            Some(expected) => meta.len() == expected,
            None => true,
        },
        _ => false,
    }
}

/// Progress of one file's transfer, derived from on-disk reality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    final_path: PathBuf,
    partial_path: PathBuf,
    bytes_confirmed: u64,
    target_size: Option<u64>,
}

impl TransferState {
    /// Builds the state by measuring the partial artifact on disk.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the partial artifact exists but its
    /// metadata cannot be read.
    #[instrument(level = "debug", skip_all, fields(path = %final_path.display()))]
    pub async fn load(final_path: PathBuf, target_size: Option<u64>) -> Result<Self, DownloadError> {
        let partial_path = partial_path_for(&final_path);
        let bytes_confirmed = match tokio::fs::metadata(&partial_path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(DownloadError::io(partial_path, e)),
        };
        debug!(bytes_confirmed, "measured partial artifact");
        Ok(Self {
            final_path,
            partial_path,
            bytes_confirmed,
            target_size: known_size(target_size),
        })
    }

    /// Path of the completed artifact.
    #[must_use]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Path of the in-progress artifact.
    #[must_use]
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    /// Bytes currently held by the partial artifact.
    #[must_use]
    pub fn bytes_confirmed(&self) -> u64 {
        self.bytes_confirmed
    }

    /// Total size of the file, when known.
    #[must_use]
    pub fn target_size(&self) -> Option<u64> {
        self.target_size
    }

    /// Offset the next ranged request should start at.
    #[must_use]
    pub fn resume_offset(&self) -> u64 {
        self.bytes_confirmed
    }

    /// Records a total size learned from response headers.
    ///
    /// A size already supplied by the catalog is kept.
    pub fn learn_target_size(&mut self, size: Option<u64>) {
        if self.target_size.is_none() {
            self.target_size = known_size(size);
        }
    }

    /// True when the partial artifact already holds every byte of a known target.
    #[must_use]
    pub fn partial_is_complete(&self) -> bool {
        self.target_size
            .is_some_and(|target| self.bytes_confirmed == target)
    }

    /// True when the partial artifact is larger than a known target.
    #[must_use]
    pub fn partial_overshoots(&self) -> bool {
        self.target_size
            .is_some_and(|target| self.bytes_confirmed > target)
    }

    /// Accounts for bytes appended to the partial artifact.
    pub fn record_written(&mut self, bytes: u64) {
        self.bytes_confirmed = self.bytes_confirmed.saturating_add(bytes);
    }

    /// Marks the partial artifact as restarted from zero (server ignored the range).
    pub fn restart(&mut self) {
        self.bytes_confirmed = 0;
    }

    /// Deletes an unusable partial artifact so the next attempt starts over.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the artifact exists but cannot be removed.
    pub async fn discard_partial(&mut self) -> Result<(), DownloadError> {
        warn!(
            path = %self.partial_path.display(),
            bytes = self.bytes_confirmed,
            target = ?self.target_size,
            "discarding unusable partial artifact"
        );
        match tokio::fs::remove_file(&self.partial_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(DownloadError::io(self.partial_path.clone(), e)),
        }
        self.bytes_confirmed = 0;
        Ok(())
    }

    /// Atomically renames the partial artifact to the final path.
    ///
    /// Readers of the final path observe either the previous file (if any) or
    /// the complete new one, never a half-written state.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if the rename fails.
    #[instrument(level = "debug", skip(self), fields(path = %self.final_path.display()))]
    pub async fn finalize(self) -> Result<PathBuf, DownloadError> {
        tokio::fs::rename(&self.partial_path, &self.final_path)
            .await
            .map_err(|e| DownloadError::io(self.final_path.clone(), e))?;
        debug!(bytes = self.bytes_confirmed, "finalized artifact");
        Ok(self.final_path)
    }
}
