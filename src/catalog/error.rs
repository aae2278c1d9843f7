//! Error types for catalog resolution.
//!
//! Every variant carries the album URL that was being resolved; a catalog
//! failure ends the whole album job before any file transfer starts.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors that can occur while turning an album URL into a file list.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No registered provider recognises the URL's host.
    #[error("unsupported host for '{url}'")]
    UnsupportedHost {
        /// The album URL.
        url: String,
    },

    /// The URL is malformed or does not point at an album on the matched host.
    #[error("invalid album URL '{url}': {reason}")]
    InvalidLocator {
        /// The album URL.
        url: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The host's listing API was unreachable or answered with something unexpected.
    #[error("listing '{url}' failed: {reason}")]
    Upstream {
        /// The album URL.
        url: String,
        /// Why the listing failed.
        reason: String,
        /// Transport error behind the failure, if any.
        #[source]
        source: Option<DownloadError>,
    },
}

impl CatalogError {
    /// Creates an `UnsupportedHost` error.
    #[must_use]
    pub fn unsupported_host(url: &str) -> Self {
        Self::UnsupportedHost {
            url: url.to_string(),
        }
    }

    /// Creates an `InvalidLocator` error.
    #[must_use]
    pub fn invalid_locator(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an `Upstream` error without an underlying transport error.
    #[must_use]
    pub fn upstream(url: &str, reason: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.to_string(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Wraps a transport failure from the listing request.
    #[must_use]
    pub fn from_transport(url: &str, source: DownloadError) -> Self {
        Self::Upstream {
            url: url.to_string(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the album URL the error is about.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::UnsupportedHost { url }
            | Self::InvalidLocator { url, .. }
            | Self::Upstream { url, .. } => url,
        }
    }

    /// Returns the failure reason without the URL prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::UnsupportedHost { .. } => "unsupported host".to_string(),
            Self::InvalidLocator { reason, .. } | Self::Upstream { reason, .. } => reason.clone(),
        }
    }
}
