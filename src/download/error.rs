//! Error types for the download module.
//!
//! This module defines structured errors for all transfer operations,
//! providing context-rich error messages for debugging and user feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a single transfer attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, reset mid-stream, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
        /// The Content-Range header value, if present (for 416 responses).
        content_range: Option<String>,
    },

    /// File system error while reading or writing local artifacts.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Artifact size does not match the size the server or catalog announced.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Partial artifact that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// A 206 response started at a different offset than the one requested.
    #[error("server resumed {url} at {received}, expected offset {expected_offset}")]
    RangeMismatch {
        /// The URL being resumed.
        url: String,
        /// Offset sent in the Range header.
        expected_offset: u64,
        /// Raw Content-Range header returned by the server.
        received: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
            content_range: None,
        }
    }

    /// Creates an HTTP status error carrying the headers the engine inspects.
    pub fn http_status_with_headers(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
        content_range: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
            content_range,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a range mismatch error.
    pub fn range_mismatch(
        url: impl Into<String>,
        expected_offset: u64,
        received: impl Into<String>,
    ) -> Self {
        Self::RangeMismatch {
            url: url.into(),
            expected_offset,
            received: received.into(),
        }
    }

    /// Returns the HTTP status code if this is an HTTP status error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Constructors instead of `From<reqwest::Error>` / `From<std::io::Error>`: every
// variant needs the URL or path that the source error does not carry.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://example.com/file.bin");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/file.bin"));
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://example.com/file.bin", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(
            msg.contains("https://example.com/file.bin"),
            "Expected URL in: {msg}"
        );
        assert_eq!(error.status(), Some(503));
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/album/a.bin.part"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/album/a.bin.part"), "Expected path in: {msg}");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_download_error_integrity_display() {
        let error = DownloadError::integrity("/tmp/a.bin.part", 100, 42);
        let msg = error.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_download_error_range_mismatch_display() {
        let error = DownloadError::range_mismatch("https://example.com/a", 10, "bytes 0-9/20");
        let msg = error.to_string();
        assert!(msg.contains("bytes 0-9/20"), "Expected header in: {msg}");
        assert!(msg.contains("10"), "Expected offset in: {msg}");
    }
}
