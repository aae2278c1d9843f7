//! Catalog providers: turning an album URL into a name and a file list.
//!
//! # Architecture
//!
//! - [`CatalogProvider`] - async trait implemented once per file-sharing host
//! - [`CatalogRegistry`] - picks the provider whose host predicate matches a URL
//! - [`Album`] / [`FileDescriptor`] - the provider's output, already sanitized
//!   for the local filesystem
//! - [`PixeldrainProvider`] - provider for `pixeldrain.com/l/<id>` lists
//!
//! The scheduler and transfer engine only ever see [`Album`]s; nothing
//! host-specific leaks past this module.
//!
//! # Example
//!
//! ```no_run
//! use albumdl_core::catalog::build_default_registry;
//! use albumdl_core::download::{ClientSettings, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&ClientSettings::default())?;
//! let registry = build_default_registry(&client);
//! let album = registry.resolve("https://pixeldrain.com/l/abc123").await?;
//! println!("{}: {} files", album.name, album.files.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod pixeldrain;
mod registry;

pub use error::CatalogError;
pub use pixeldrain::{PIXELDRAIN_API_BASE, PixeldrainProvider};
pub use registry::CatalogRegistry;

use async_trait::async_trait;
use url::Url;

use crate::download::{HttpClient, known_size, sanitize_album_name, sanitize_file_name};

/// Builds the registry with every built-in provider.
#[must_use]
pub fn build_default_registry(client: &HttpClient) -> CatalogRegistry {
    let mut registry = CatalogRegistry::new();
    registry.register(Box::new(PixeldrainProvider::new(client.clone())));
    registry
}

/// Host-specific resolver producing an album's name and file list.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this provider handles `url`'s host.
    fn matches(&self, url: &Url) -> bool;

    /// Lists the album behind `url`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidLocator`] if the URL does not name an album
    /// - [`CatalogError::Upstream`] if the listing cannot be fetched or parsed
    async fn resolve(&self, url: &Url) -> Result<Album, CatalogError>;
}

/// One file inside an album. Immutable once produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Opaque host-specific identifier.
    pub id: String,
    /// File name, sanitized for the local filesystem.
    pub name: String,
    /// Size announced by the host; `None` when unknown.
    pub expected_size: Option<u64>,
    /// URL the bytes are fetched from.
    pub locator: String,
}

impl FileDescriptor {
    /// Creates a descriptor, sanitizing `name` and treating a zero size as unknown.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: &str,
        expected_size: Option<u64>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: sanitize_file_name(name),
            expected_size: known_size(expected_size),
            locator: locator.into(),
        }
    }
}

/// A resolved album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    /// Directory-safe display name.
    pub name: String,
    /// Files in listing order.
    pub files: Vec<FileDescriptor>,
}

impl Album {
    /// Creates an album, sanitizing `name`.
    #[must_use]
    pub fn new(name: &str, files: Vec<FileDescriptor>) -> Self {
        Self {
            name: sanitize_album_name(name),
            files,
        }
    }

    /// Names that appear more than once in this album.
    ///
    /// Colliding files overwrite each other on disk; the caller decides how
    /// loudly to report it.
    #[must_use]
    pub fn colliding_names(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut dupes: Vec<&str> = Vec::new();
        for file in &self.files {
            if !seen.insert(file.name.as_str()) && !dupes.contains(&file.name.as_str()) {
                dupes.push(&file.name);
            }
        }
        dupes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_descriptor_sanitizes_and_normalizes() {
        let file = FileDescriptor::new("x1", " a/b?.jpg ", Some(0), "https://h/x1");
        assert_eq!(file.name, "ab.jpg");
        assert_eq!(file.expected_size, None);

        let sized = FileDescriptor::new("x2", "c.jpg", Some(10), "https://h/x2");
        assert_eq!(sized.expected_size, Some(10));
    }

    #[test]
    fn test_album_name_sanitized_with_placeholder() {
        assert_eq!(Album::new("My: Trip", vec![]).name, "My Trip");
        assert_eq!(Album::new("???", vec![]).name, "Album");
    }

    #[test]
    fn test_colliding_names_reported_once() {
        let album = Album::new(
            "a",
            vec![
                FileDescriptor::new("1", "x.jpg", None, "u1"),
                FileDescriptor::new("2", "x.jpg", None, "u2"),
                FileDescriptor::new("3", "x?.jpg", None, "u3"),
                FileDescriptor::new("4", "y.jpg", None, "u4"),
            ],
        );
        assert_eq!(album.colliding_names(), vec!["x.jpg"]);
    }
}
