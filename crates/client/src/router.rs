//! Request classification.
//!
//! Rules, first match wins:
//!
//! 1. non-network scheme → bypass
//! 2. host matches a bypass pattern → bypass, even for static paths
//! 3. method other than GET → bypass
//! 4. URL matches an always-fresh pattern → network-first
//! 5. same origin and a static-asset path with no query → cache-first
//! 6. any other same-origin request → stale-while-revalidate
//! 7. anything cross-origin left over → bypass
//!
//! A path-shaped always-fresh pattern (leading `/`) only matches same-origin
//! paths. Any other pattern is matched against host and path, so
//! cross-origin responses are only written when a pattern names their host.

use precache_core::{AppConfig, ConfigError};
use reqwest::{Method, Url};

use crate::fetch::{FetchRequest, is_network_scheme, resolve};

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    /// Not intercepted; the environment handles the request.
    Bypass,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::Bypass => "bypass",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table-driven request router.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    static_paths: Vec<String>,
    fresh_patterns: Vec<String>,
    bypass_hosts: Vec<String>,
}

impl Router {
    /// Build a router for `origin`.
    ///
    /// Path-shaped fresh patterns (leading `/`) are also matched in their
    /// percent-encoded form, so `/JULY PROMO.xlsx` matches the URL the
    /// request actually carries.
    pub fn new(origin: Url, static_paths: Vec<String>, fresh_patterns: Vec<String>, bypass_hosts: Vec<String>) -> Self {
        let mut patterns = Vec::with_capacity(fresh_patterns.len());
        for pattern in fresh_patterns {
            if pattern.starts_with('/')
                && let Ok(encoded) = resolve(&origin, &pattern)
                && encoded.path() != pattern
            {
                patterns.push(encoded.path().to_string());
            }
            patterns.push(pattern);
        }

        Self {
            origin,
            static_paths,
            fresh_patterns: patterns,
            bypass_hosts: bypass_hosts.into_iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    /// Build a router from the worker configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.origin_url()?,
            config.static_assets.clone(),
            config.always_fresh.clone(),
            config.bypass_hosts.clone(),
        ))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    fn is_always_fresh(&self, url: &Url) -> bool {
        let same_origin = self.is_same_origin(url);
        let host_and_path = format!("{}{}", url.host_str().unwrap_or_default(), url.path());

        self.fresh_patterns.iter().any(|pattern| {
            if pattern.starts_with('/') {
                same_origin && url.path().starts_with(pattern.as_str())
            } else {
                host_and_path.contains(pattern.as_str())
            }
        })
    }

    /// Pick the strategy for a request.
    pub fn classify(&self, request: &FetchRequest) -> Strategy {
        let url = &request.url;

        if !is_network_scheme(url) {
            return Strategy::Bypass;
        }

        let host = url.host_str().unwrap_or_default();
        if self.bypass_hosts.iter().any(|pattern| host.contains(pattern.as_str())) {
            return Strategy::Bypass;
        }

        if request.method != Method::GET {
            return Strategy::Bypass;
        }

        if self.is_always_fresh(url) {
            return Strategy::NetworkFirst;
        }

        if !self.is_same_origin(url) {
            return Strategy::Bypass;
        }

        if url.query().is_none() && self.static_paths.iter().any(|path| path == url.path()) {
            return Strategy::CacheFirst;
        }

        Strategy::StaleWhileRevalidate
    }
}
