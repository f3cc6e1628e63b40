//! Cache area lifecycle: install-time provisioning, activation-time reaping,
//! and explicit clears.

use std::sync::Arc;

use precache_core::{AppConfig, CacheArea, CacheDb, ConfigError, Error};
use reqwest::Url;

use crate::fetch::{Fetch, FetchRequest, resolve};

/// Outcome of provisioning the static area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Asset URLs now cached.
    pub cached: Vec<String>,
    /// Asset paths that could not be cached, with the reason.
    pub failed: Vec<(String, String)>,
}

impl ProvisionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the areas of one worker generation.
pub struct StoreManager {
    db: CacheDb,
    fetcher: Arc<dyn Fetch>,
    origin: Url,
    area_prefix: String,
    static_area: CacheArea,
    dynamic_area: CacheArea,
    static_assets: Vec<String>,
}

impl StoreManager {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetch>, config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            db,
            fetcher,
            origin: config.origin_url()?,
            area_prefix: config.area_prefix.clone(),
            static_area: config.static_area(),
            dynamic_area: config.dynamic_area(),
            static_assets: config.static_assets.clone(),
        })
    }

    /// Open this version's static area and fill it with the static assets.
    ///
    /// Assets are fetched one by one from the serving origin. A failed asset
    /// is recorded and skipped; only failing to open the area itself is an
    /// error.
    pub async fn provision(&self) -> Result<ProvisionReport, Error> {
        self.db.open_area(&self.static_area).await?;

        let mut report = ProvisionReport::default();
        for path in &self.static_assets {
            match self.provision_asset(path).await {
                Ok(url) => report.cached.push(url),
                Err(e) => {
                    tracing::warn!(asset = %path, error = %e, "skipping static asset");
                    report.failed.push((path.clone(), e.to_string()));
                }
            }
        }

        if report.cached.is_empty() && !self.static_assets.is_empty() {
            tracing::error!(area = %self.static_area.name, "no static assets could be cached");
        } else {
            tracing::info!(
                area = %self.static_area.name,
                cached = report.cached.len(),
                failed = report.failed.len(),
                "static assets provisioned"
            );
        }

        Ok(report)
    }

    async fn provision_asset(&self, path: &str) -> Result<String, Error> {
        let url = resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request = FetchRequest::get(url.as_str())?;

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(Error::NetworkFailure(format!("{} returned {}", request.url, response.status.as_u16())));
        }

        self.db.put_entry(&self.static_area, &response.to_entry(&request)).await?;
        Ok(request.url.to_string())
    }

    /// Names this generation keeps.
    pub fn current_area_names(&self) -> Vec<String> {
        vec![self.static_area.name.clone(), self.dynamic_area.name.clone()]
    }

    /// Delete every area of this application not named in `current`.
    pub async fn activate_and_reap(&self, current: &[String]) -> Result<Vec<String>, Error> {
        let deleted = self.db.reap_areas(&self.area_prefix, current).await?;
        for name in &deleted {
            tracing::info!(area = %name, "deleted superseded cache area");
        }
        Ok(deleted)
    }

    /// Delete every area of this application, whatever its version.
    pub async fn clear_all(&self) -> Result<Vec<String>, Error> {
        let deleted = self.db.clear_areas(&self.area_prefix).await?;
        tracing::info!(count = deleted.len(), "cleared cache areas");
        Ok(deleted)
    }
}
