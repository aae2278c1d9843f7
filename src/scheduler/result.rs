//! Per-album outcome counts.

use std::fmt;

use crate::download::TransferOutcome;

/// Aggregated result of one album job. Produced once all its files reached a
/// terminal outcome, or immediately when the album could not be listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumResult {
    /// Sanitized album name; empty when the catalog lookup failed.
    pub album: String,
    /// The URL the job was submitted with.
    pub source_url: String,
    /// Files completed during this run.
    pub downloaded: usize,
    /// Files already present with the expected size.
    pub skipped: usize,
    /// Files that exhausted retries or hit a permanent error.
    pub failed: usize,
    /// Album-level failure (catalog lookup or destination directory).
    pub error: Option<String>,
}

impl AlbumResult {
    /// Creates an empty result for `album`.
    #[must_use]
    pub fn new(album: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            album: album.into(),
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// Creates a result for an album that failed before any transfer started.
    #[must_use]
    pub fn album_failure(source_url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Counts one file outcome.
    pub fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Downloaded => self.downloaded += 1,
            TransferOutcome::Skipped => self.skipped += 1,
            TransferOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of files accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    /// True when the album failed as a whole.
    #[must_use]
    pub fn is_album_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for AlbumResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "Error: {}: {error}", self.source_url),
            None => write!(
                f,
                "{}: ok={} skip={} fail={}",
                self.album, self.downloaded, self.skipped, self.failed
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_each_outcome() {
        let mut result = AlbumResult::new("Trip", "https://pixeldrain.com/l/x");
        result.record(TransferOutcome::Downloaded);
        result.record(TransferOutcome::Downloaded);
        result.record(TransferOutcome::Skipped);
        result.record(TransferOutcome::Failed);

        assert_eq!(
            (result.downloaded, result.skipped, result.failed),
            (2, 1, 1)
        );
        assert_eq!(result.total(), 4);
        assert!(!result.is_album_failure());
    }

    #[test]
    fn test_summary_format() {
        let mut result = AlbumResult::new("Trip", "https://pixeldrain.com/l/x");
        result.record(TransferOutcome::Downloaded);
        assert_eq!(result.to_string(), "Trip: ok=1 skip=0 fail=0");
    }

    #[test]
    fn test_album_failure_format() {
        let result = AlbumResult::album_failure("https://example.com/a", "unsupported host");
        assert!(result.is_album_failure());
        assert_eq!(result.total(), 0);
        assert_eq!(
            result.to_string(),
            "Error: https://example.com/a: unsupported host"
        );
    }
}
