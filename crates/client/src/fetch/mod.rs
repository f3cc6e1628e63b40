//! Intercepted requests, responses, and the network fetch pipeline.
//!
//! ### Requests
//! - Parsed from a method string, a URL, and a destination hint
//! - Network URLs are canonicalized (lowercase host, no fragment) so the
//!   same resource always produces the same cache key
//! - Non-network URLs are kept verbatim; the router never intercepts them
//!
//! ### Fetching
//! - [`Fetch`] is the seam between strategies and the network
//! - [`FetchClient`] implements it with reqwest: byte limit, timeout,
//!   redirect cap
//! - A non-success status is still a response; only transport failures are
//!   errors

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
pub use reqwest::{Method, StatusCode, Url};
use std::str::FromStr;
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, is_network_scheme, resolve};

use precache_core::{CacheEntry, Error};

/// What the requester intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// A page navigation.
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    /// `fetch()`/XHR or anything without a more specific hint.
    #[default]
    Other,
}

impl FromStr for Destination {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "image" => Destination::Image,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => Destination::Other,
        })
    }
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub destination: Destination,
    pub headers: HeaderMap,
}

impl FetchRequest {
    /// Build a request from loosely-typed parts.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unparseable method and
    /// `Error::InvalidUrl` for an unparseable URL.
    pub fn parse(method: &str, url: &str, destination: Destination) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method '{method}': {e}")))?;

        let parsed = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let url = if is_network_scheme(&parsed) {
            canonicalize(parsed.as_str()).map_err(|e| Error::InvalidUrl(e.to_string()))?
        } else {
            parsed
        };

        Ok(Self { method, url, destination, headers: HeaderMap::new() })
    }

    /// A plain GET with no destination hint.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::parse("GET", url, Destination::Other)
    }

    /// A page navigation.
    pub fn navigate(url: &str) -> Result<Self, Error> {
        Self::parse("GET", url, Destination::Document)
    }

    pub fn is_document(&self) -> bool {
        self.destination == Destination::Document
    }

    /// Request identity used as the cache key.
    pub fn cache_key(&self) -> String {
        precache_core::cache::hash::compute_cache_key(self.method.as_str(), self.url.as_str())
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built locally because neither network nor cache could answer.
    Synthesized,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Synthesized => "synthesized",
        }
    }
}

/// Response from a fetch, a cache lookup, or an offline fallback.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: HeaderMap,
    /// Time taken to fetch in milliseconds (0 when not fetched)
    pub fetch_ms: u64,
    pub source: ResponseSource,
}

impl FetchResponse {
    /// Build a local response with a single Content-Type header.
    pub fn synthesized(url: &Url, status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self {
            url: url.clone(),
            final_url: url.clone(),
            status,
            content_type: Some(content_type.to_string()),
            bytes: body.into(),
            headers,
            fetch_ms: 0,
            source: ResponseSource::Synthesized,
        }
    }

    /// Rebuild a response from a stored snapshot.
    ///
    /// Headers that no longer parse are dropped rather than failing the hit.
    pub fn from_entry(entry: CacheEntry, requested: &Url) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        let final_url = Url::parse(&entry.url).unwrap_or_else(|_| requested.clone());
        Self {
            url: requested.clone(),
            final_url,
            status: StatusCode::from_u16(entry.status_code).unwrap_or(StatusCode::OK),
            content_type: entry.header(header::CONTENT_TYPE.as_str()).map(str::to_string),
            bytes: Bytes::from(entry.body),
            headers,
            fetch_ms: 0,
            source: ResponseSource::Cache,
        }
    }

    /// Snapshot this response for storage under the request's identity.
    pub fn to_entry(&self, request: &FetchRequest) -> CacheEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        CacheEntry::new(request.method.as_str(), request.url.as_str(), self.status.as_u16(), headers, self.bytes.to_vec())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Network access used by the strategies.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was obtained; HTTP error
    /// statuses come back as `Ok`.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "precache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "precache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&precache_core::AppConfig> for FetchConfig {
    fn from(config: &precache_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Fetch for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Error::NetworkFailure(format!("{}: {}", request.url, e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkFailure(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url,
            status,
            content_type,
            bytes,
            headers,
            fetch_ms,
            source: ResponseSource::Network,
        })
    }
}
