//! Catalog provider for Pixeldrain lists (`https://pixeldrain.com/l/<id>`).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{Album, CatalogError, CatalogProvider, FileDescriptor};
use crate::download::HttpClient;

/// Public API base.
pub const PIXELDRAIN_API_BASE: &str = "https://pixeldrain.com";

const HOSTS: &[&str] = &["pixeldrain.com", "www.pixeldrain.com"];

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    files: Vec<ListFile>,
}

#[derive(Debug, Deserialize)]
struct ListFile {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// Resolves Pixeldrain lists through the JSON API.
#[derive(Debug, Clone)]
pub struct PixeldrainProvider {
    client: HttpClient,
    api_base: String,
}

impl PixeldrainProvider {
    /// Creates a provider talking to the public API.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self::with_api_base(client, PIXELDRAIN_API_BASE)
    }

    /// Creates a provider talking to `api_base` (used by tests with a mock server).
    #[must_use]
    pub fn with_api_base(client: HttpClient, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// URL the bytes of file `file_id` are served from.
    #[must_use]
    pub fn file_url(&self, file_id: &str) -> String {
        format!("{}/api/file/{file_id}", self.api_base)
    }

    fn list_url(&self, list_id: &str) -> String {
        format!("{}/api/list/{list_id}", self.api_base)
    }
}

/// Extracts the list id from `/l/<id>`.
fn list_id(url: &Url) -> Option<&str> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("l"), Some(id)) => Some(id),
        _ => None,
    }
}

#[async_trait]
impl CatalogProvider for PixeldrainProvider {
    fn name(&self) -> &'static str {
        "pixeldrain"
    }

    fn matches(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)))
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn resolve(&self, url: &Url) -> Result<Album, CatalogError> {
        let id = list_id(url)
            .ok_or_else(|| CatalogError::invalid_locator(url.as_str(), "expected /l/<id>"))?;

        let listing: ListResponse = self
            .client
            .get_json(&self.list_url(id))
            .await
            .map_err(|e| match e.status() {
                Some(404) => CatalogError::upstream(url.as_str(), "album not found"),
                _ => CatalogError::from_transport(url.as_str(), e),
            })?;

        let display_name = listing
            .name
            .filter(|n| !n.trim().is_empty())
            .or(listing.title.filter(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| format!("Album_{id}"));

        let files: Vec<FileDescriptor> = listing
            .files
            .into_iter()
            .map(|f| {
                let name = f.name.unwrap_or_else(|| f.id.clone());
                let locator = self.file_url(&f.id);
                FileDescriptor::new(f.id, &name, f.size, locator)
            })
            .collect();
        debug!(album = %display_name, files = files.len(), "listed pixeldrain album");

        Ok(Album::new(&display_name, files))
    }
}
