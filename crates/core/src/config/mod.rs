//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRECACHE_*)
//! 2. TOML config file (if PRECACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The routing tables (static assets, always-fresh patterns, bypass hosts) and
//! the version string are plain data; one deployment differs from another only
//! by what it puts here.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{AreaPurpose, CacheArea};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRECACHE_*)
/// 2. TOML config file (if PRECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display name used on the offline page.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Origin the worker serves, e.g. `https://promo.example.com`.
    ///
    /// Only requests on this origin are ever written to a cache area.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version identifier of this worker generation.
    ///
    /// Becomes the suffix of every area name and is what GET_VERSION replies.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every area this application owns.
    ///
    /// Activation and clearing never touch areas without this prefix.
    #[serde(default = "default_area_prefix")]
    pub area_prefix: String,

    /// Paths cached at install time and served cache-first.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// URL substrings that must always be fetched fresh.
    #[serde(default = "default_always_fresh")]
    pub always_fresh: Vec<String>,

    /// Hostname substrings that are never intercepted.
    #[serde(default = "default_bypass_hosts")]
    pub bypass_hosts: Vec<String>,

    /// Document served when a page cannot be fetched.
    #[serde(default = "default_offline_shell")]
    pub offline_shell: String,

    /// Tag that wakes the background data sync.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Path refreshed by the background data sync.
    #[serde(default = "default_sync_url")]
    pub sync_url: String,

    /// Path to SQLite cache database.
    ///
    /// Set via PRECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Intercepted requests slower than this are logged as warnings.
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,

    /// Notification title used when a push payload carries none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Notification body used when a push payload carries none.
    #[serde(default = "default_notification_body")]
    pub notification_body: String,

    /// Icon attached to every notification.
    #[serde(default)]
    pub notification_icon: Option<String>,
}

fn default_app_name() -> String {
    "Precache".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_version() -> String {
    "1.0".into()
}

fn default_area_prefix() -> String {
    "precache-".into()
}

fn default_static_assets() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_always_fresh() -> Vec<String> {
    vec!["/data/catalog.xlsx".into(), "googleapis.com".into(), "google.com/drive".into()]
}

fn default_bypass_hosts() -> Vec<String> {
    vec!["googleapis.com".into(), "google.com".into(), "cdn.tailwindcss.com".into(), "raw.githubusercontent.com".into()]
}

fn default_offline_shell() -> String {
    "/index.html".into()
}

fn default_sync_tag() -> String {
    "background-sync".into()
}

fn default_sync_url() -> String {
    "/data/catalog.xlsx".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./precache.sqlite")
}

fn default_user_agent() -> String {
    "precache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_slow_request_ms() -> u64 {
    2_000
}

fn default_notification_title() -> String {
    "New deals".into()
}

fn default_notification_body() -> String {
    "New promotional deals available!".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            origin: default_origin(),
            version: default_version(),
            area_prefix: default_area_prefix(),
            static_assets: default_static_assets(),
            always_fresh: default_always_fresh(),
            bypass_hosts: default_bypass_hosts(),
            offline_shell: default_offline_shell(),
            sync_tag: default_sync_tag(),
            sync_url: default_sync_url(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            slow_request_ms: default_slow_request_ms(),
            notification_title: default_notification_title(),
            notification_body: default_notification_body(),
            notification_icon: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Slow-request threshold as Duration.
    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }

    /// The serving origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Area holding install-time assets for this version.
    pub fn static_area(&self) -> CacheArea {
        CacheArea::new(format!("{}static-v{}", self.area_prefix, self.version), AreaPurpose::Static)
    }

    /// Area holding runtime-cached responses for this version.
    pub fn dynamic_area(&self) -> CacheArea {
        CacheArea::new(format!("{}dynamic-v{}", self.area_prefix, self.version), AreaPurpose::Dynamic)
    }

    /// Names of the areas this generation keeps at activation.
    pub fn current_area_names(&self) -> Vec<String> {
        vec![self.static_area().name, self.dynamic_area().name]
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRECACHE_`
    /// 2. TOML file from `PRECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRECACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
