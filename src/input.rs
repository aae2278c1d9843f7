//! Album URLs from command-line arguments and URL list files.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\]]+"#).expect("URL regex is valid") // Static pattern, safe to panic
});

/// Errors raised while reading URL input.
#[derive(Debug, Error)]
pub enum InputError {
    /// The URL list file could not be read.
    #[error("cannot read URL list {path}: {source}")]
    Unreadable {
        /// The list file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Album locators gathered from all inputs, in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UrlList {
    /// Distinct locators to submit, malformed ones included.
    pub urls: Vec<String>,
    /// Entries that contained no http(s) URL. They stay in `urls` so each
    /// one is reported as a failed album.
    pub malformed: Vec<String>,
}

impl UrlList {
    /// True when there is nothing to submit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    fn push_entry(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() || entry.starts_with('#') {
            return;
        }
        let found = extract_urls(entry);
        if found.is_empty() {
            debug!(entry, "no URL in input entry");
            if self.push_unique(entry.to_string()) {
                self.malformed.push(entry.to_string());
            }
            return;
        }
        for url in found {
            self.push_unique(url);
        }
    }

    fn push_unique(&mut self, locator: String) -> bool {
        if self.urls.contains(&locator) {
            return false;
        }
        self.urls.push(locator);
        true
    }
}

/// Finds every http(s) URL in `text`, trimming trailing sentence punctuation.
#[must_use]
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ')']).to_string())
        .collect()
}

/// Reads a newline-separated URL list. Blank lines and `#` comments are ignored.
///
/// # Errors
///
/// Returns [`InputError::Unreadable`] if the file cannot be read.
pub fn read_url_file(path: &Path) -> Result<UrlList, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut list = UrlList::default();
    for line in text.lines() {
        list.push_entry(line);
    }
    Ok(list)
}

/// Merges positional arguments with an optional URL list file; arguments come first.
///
/// # Errors
///
/// Returns [`InputError::Unreadable`] if `input_file` cannot be read.
#[instrument(skip(args), fields(args = args.len()))]
pub fn collect_urls(args: &[String], input_file: Option<&Path>) -> Result<UrlList, InputError> {
    let mut list = UrlList::default();
    for arg in args {
        list.push_entry(arg);
    }
    if let Some(path) = input_file {
        let from_file = read_url_file(path)?;
        for url in from_file.urls {
            list.push_entry(&url);
        }
    }
    for entry in &list.malformed {
        warn!(entry = %entry, "input has no http(s) URL; it will fail as an invalid album URL");
    }
    debug!(urls = list.urls.len(), "collected album URLs");
    Ok(list)
}
