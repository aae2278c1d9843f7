//! HTTP client wrapper for ranged file fetches and catalog API calls.
//!
//! One [`HttpClient`] is built per run and cloned into every worker so all
//! transfers share reqwest's connection pool.

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE, RETRY_AFTER};
use reqwest::{Client, Proxy, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Connection settings for [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Maximum idle time between reads of a response body.
    pub read_timeout: Duration,
    /// Proxy URL applied to every scheme (`http://`, `https://`, `socks5://`).
    pub proxy: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            proxy: None,
        }
    }
}

/// Pooled HTTP client used by the transfer engine and catalog providers.
///
/// ```no_run
/// use albumdl_core::download::{ClientSettings, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(&ClientSettings::default())?;
/// let response = client.fetch("https://pixeldrain.com/api/file/abc", 1024).await?;
/// println!("status {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Builds a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the proxy URL is invalid or the TLS
    /// backend cannot be initialised.
    #[instrument(level = "debug", skip_all, fields(proxy = settings.proxy.as_deref()))]
    pub fn new(settings: &ClientSettings) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.read_timeout)
            .gzip(true)
            .user_agent(user_agent::default_user_agent());
        if let Some(proxy) = settings.proxy.as_deref() {
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        let client = builder.build()?;
        debug!("built http client");
        Ok(Self { client })
    }

    /// Issues a `GET` for `url`, asking for bytes from `offset` onward when non-zero.
    ///
    /// Any 2xx response is returned for the caller to inspect (200 vs 206).
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Timeout`] / [`DownloadError::Network`] on transport failure
    /// - [`DownloadError::HttpStatus`] for non-2xx responses, carrying the
    ///   `Retry-After` and `Content-Range` headers
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str, offset: u64) -> Result<Response, DownloadError> {
        let mut request = self.client.get(url);
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }
        let response = request.send().await.map_err(|e| map_send_error(url, e))?;
        ensure_success(url, response)
    }

    /// Fetches `url` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`HttpClient::fetch`]; a body that does not decode is reported
    /// as [`DownloadError::Network`].
    #[instrument(level = "debug", skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_send_error(url, e))?;
        let response = ensure_success(url, response)?;
        response
            .json::<T>()
            .await
            .map_err(|e| DownloadError::network(url, e))
    }
}

fn map_send_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

fn ensure_success(url: &str, response: Response) -> Result<Response, DownloadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(DownloadError::http_status_with_headers(
        url,
        status.as_u16(),
        header_string(&response, RETRY_AFTER),
        header_string(&response, CONTENT_RANGE),
    ))
}

fn header_string(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Returns the response's `Content-Length`, if present and numeric.
#[must_use]
pub fn content_length(response: &Response) -> Option<u64> {
    header_string(response, CONTENT_LENGTH).and_then(|v| v.trim().parse().ok())
}

/// Returns the raw `Content-Range` header, if present.
#[must_use]
pub fn content_range(response: &Response) -> Option<String> {
    header_string(response, CONTENT_RANGE)
}

/// Parsed `Content-Range` header (`bytes start-end/total` or `bytes */total`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First byte of the range; `None` for the unsatisfied form.
    pub start: Option<u64>,
    /// Full size of the resource, when the server reports it.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Parses a `Content-Range` value. Returns `None` for anything but the
    /// `bytes` unit.
    ///
    /// ```
    /// use albumdl_core::download::ContentRange;
    ///
    /// let r = ContentRange::parse("bytes 100-199/1000").unwrap();
    /// assert_eq!((r.start, r.total), (Some(100), Some(1000)));
    ///
    /// let r = ContentRange::parse("bytes */1000").unwrap();
    /// assert_eq!((r.start, r.total), (None, Some(1000)));
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = rest.split_once('/')?;
        let total = match total.trim() {
            "*" => None,
            raw => Some(raw.parse().ok()?),
        };
        let start = match range.trim() {
            "*" => None,
            raw => {
                let (start, _end) = raw.split_once('-')?;
                Some(start.trim().parse().ok()?)
            }
        };
        Some(Self { start, total })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(&ClientSettings::default()).unwrap()
    }

    #[test]
    fn test_content_range_parse_forms() {
        assert_eq!(
            ContentRange::parse("bytes 6-11/12"),
            Some(ContentRange {
                start: Some(6),
                total: Some(12)
            })
        );
        assert_eq!(
            ContentRange::parse("bytes 0-9/*"),
            Some(ContentRange {
                start: Some(0),
                total: None
            })
        );
        assert_eq!(
            ContentRange::parse("bytes */42"),
            Some(ContentRange {
                start: None,
                total: Some(42)
            })
        );
    }

    #[test]
    fn test_content_range_parse_rejects_garbage() {
        assert_eq!(ContentRange::parse("items 0-1/2"), None);
        assert_eq!(ContentRange::parse("bytes abc"), None);
        assert_eq!(ContentRange::parse(""), None);
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let settings = ClientSettings {
            proxy: Some("http://[::1".to_string()),
            ..ClientSettings::default()
        };
        assert!(HttpClient::new(&settings).is_err());
    }

    #[tokio::test]
    async fn test_fetch_without_offset_sends_no_range() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/file"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello"))
            .mount(&server)
            .await;

        let response = client()
            .fetch(&format!("{}/file", server.uri()), 0)
            .await
            .unwrap();
        let received = server.received_requests().await.unwrap();
        assert!(!received[0].headers.contains_key("range"));
        assert_eq!(content_length(&response), Some(5));
    }

    #[tokio::test]
    async fn test_fetch_with_offset_sends_range() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/file"))
            .and(header("range", "bytes=3-"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", "bytes 3-4/5")
                    .set_body_bytes(b"lo"),
            )
            .mount(&server)
            .await;

        let response = client()
            .fetch(&format!("{}/file", server.uri()), 3)
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 206);
        assert_eq!(content_range(&response).as_deref(), Some("bytes 3-4/5"));
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status_with_headers() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let error = client()
            .fetch(&format!("{}/busy", server.uri()), 0)
            .await
            .unwrap_err();
        match error {
            DownloadError::HttpStatus {
                status,
                retry_after,
                ..
            } => {
                assert_eq!(status, 429);
                assert_eq!(retry_after.as_deref(), Some("7"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"n": 3})))
            .mount(&server)
            .await;

        let value: serde_json::Value = client()
            .get_json(&format!("{}/api", server.uri()))
            .await
            .unwrap();
        assert_eq!(value["n"], 3);
    }
}
