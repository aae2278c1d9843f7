//! Provider registry: selects one catalog provider per album URL.

use tracing::{debug, info, instrument};
use url::Url;

use super::{Album, CatalogError, CatalogProvider};

/// Ordered collection of providers. The first provider whose host predicate
/// matches a URL handles it.
pub struct CatalogRegistry {
    providers: Vec<Box<dyn CatalogProvider>>,
}

impl CatalogRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registers a provider after those already registered.
    #[instrument(skip(self, provider), fields(provider = provider.name()))]
    pub fn register(&mut self, provider: Box<dyn CatalogProvider>) {
        debug!("registering catalog provider");
        self.providers.push(provider);
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns the provider that would handle `url`, if any.
    #[must_use]
    pub fn find_provider(&self, url: &Url) -> Option<&dyn CatalogProvider> {
        self.providers
            .iter()
            .find(|p| p.matches(url))
            .map(AsRef::as_ref)
    }

    /// Resolves an album URL through the matching provider.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidLocator`] if `input` is not an http(s) URL
    /// - [`CatalogError::UnsupportedHost`] if no provider matches
    /// - whatever the provider returns
    #[instrument(skip(self))]
    pub async fn resolve(&self, input: &str) -> Result<Album, CatalogError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed)
            .map_err(|e| CatalogError::invalid_locator(trimmed, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CatalogError::invalid_locator(
                trimmed,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let provider = self
            .find_provider(&url)
            .ok_or_else(|| CatalogError::unsupported_host(trimmed))?;
        debug!(provider = provider.name(), "selected catalog provider");

        let album = provider.resolve(&url).await?;
        info!(
            provider = provider.name(),
            album = %album.name,
            files = album.files.len(),
            "resolved album"
        );
        Ok(album)
    }
}

impl std::fmt::Debug for CatalogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("CatalogRegistry")
            .field("providers", &names)
            .finish()
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::FileDescriptor;
    use async_trait::async_trait;

    struct HostProvider {
        host: &'static str,
        label: &'static str,
    }

    #[async_trait]
    impl CatalogProvider for HostProvider {
        fn name(&self) -> &'static str {
            self.label
        }

        fn matches(&self, url: &Url) -> bool {
            url.host_str() == Some(self.host)
        }

        async fn resolve(&self, url: &Url) -> Result<Album, CatalogError> {
            Ok(Album::new(
                self.label,
                vec![FileDescriptor::new("1", "a.bin", Some(1), url.as_str())],
            ))
        }
    }

    fn registry() -> CatalogRegistry {
        let mut registry = CatalogRegistry::new();
        registry.register(Box::new(HostProvider {
            host: "one.example",
            label: "first",
        }));
        registry.register(Box::new(HostProvider {
            host: "one.example",
            label: "shadowed",
        }));
        registry.register(Box::new(HostProvider {
            host: "two.example",
            label: "second",
        }));
        registry
    }

    #[test]
    fn test_empty_registry() {
        let registry = CatalogRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.provider_count(), 0);
    }

    #[tokio::test]
    async fn test_first_matching_provider_wins() {
        let album = registry().resolve("https://one.example/l/x").await.unwrap();
        assert_eq!(album.name, "first");

        let album = registry().resolve("  https://two.example/l/y \n").await.unwrap();
        assert_eq!(album.name, "second");
    }

    #[tokio::test]
    async fn test_unknown_host_is_unsupported() {
        let error = registry()
            .resolve("https://three.example/l/x")
            .await
            .unwrap_err();
        assert!(matches!(error, CatalogError::UnsupportedHost { .. }));
    }

    #[tokio::test]
    async fn test_malformed_url_is_invalid_locator() {
        let error = registry().resolve("not a url").await.unwrap_err();
        assert!(matches!(error, CatalogError::InvalidLocator { .. }));

        let error = registry().resolve("ftp://one.example/l/x").await.unwrap_err();
        assert!(matches!(error, CatalogError::InvalidLocator { .. }));
    }

    #[test]
    fn test_debug_lists_provider_names() {
        let debug = format!("{:?}", registry());
        assert!(debug.contains("first"));
        assert!(debug.contains("second"));
    }
}
