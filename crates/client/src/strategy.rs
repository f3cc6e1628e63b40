//! Strategy executors.
//!
//! Every executor ends in a response. Network failures become cached copies
//! or synthesized offline responses, and cache reads or writes that fail are
//! logged and treated as misses or skipped writes.

use std::sync::Arc;

use precache_core::{AppConfig, CacheArea, CacheDb, ConfigError, Error};

use crate::fetch::{Fetch, FetchRequest, FetchResponse, resolve};
use crate::offline;
use crate::router::Strategy;

/// Runs the caching strategies against one cache store.
///
/// Cheap to clone; stale-while-revalidate moves a clone into its background
/// task.
#[derive(Clone)]
pub struct StrategyExecutor {
    fetcher: Arc<dyn Fetch>,
    db: CacheDb,
    static_area: CacheArea,
    dynamic_area: CacheArea,
    area_prefix: String,
    shell: Option<FetchRequest>,
    app_name: String,
}

impl StrategyExecutor {
    pub fn new(fetcher: Arc<dyn Fetch>, db: CacheDb, config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let shell = resolve(&origin, &config.offline_shell)
            .ok()
            .and_then(|url| FetchRequest::navigate(url.as_str()).ok());

        Ok(Self {
            fetcher,
            db,
            static_area: config.static_area(),
            dynamic_area: config.dynamic_area(),
            area_prefix: config.area_prefix.clone(),
            shell,
            app_name: config.app_name.clone(),
        })
    }

    /// Run `strategy`; `None` for bypass.
    pub async fn execute(&self, strategy: Strategy, request: &FetchRequest) -> Option<FetchResponse> {
        match strategy {
            Strategy::CacheFirst => Some(self.cache_first(request).await),
            Strategy::NetworkFirst => Some(self.network_first(request).await),
            Strategy::StaleWhileRevalidate => Some(self.stale_while_revalidate(request).await),
            Strategy::Bypass => None,
        }
    }

    /// Serve from the static area, falling back to the network.
    pub async fn cache_first(&self, request: &FetchRequest) -> FetchResponse {
        if let Some(hit) = self.lookup(&self.static_area, request).await {
            tracing::debug!(url = %request.url, "cache-first hit");
            return hit;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(&self.static_area, request, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "cache-first fetch failed");
                match self.cached_shell().await {
                    Some(shell) => shell,
                    None => offline::unavailable(&request.url, "Offline"),
                }
            }
        }
    }

    /// Fetch fresh, falling back to any cached copy.
    pub async fn network_first(&self, request: &FetchRequest) -> FetchResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => {
                self.store(&self.dynamic_area, request, &response).await;
                response
            }
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status.as_u16(), "network-first got error status");
                self.lookup_any(request).await.unwrap_or(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed, trying cache");
                match self.lookup_any(request).await {
                    Some(hit) => hit,
                    None => self.offline_fallback(request).await,
                }
            }
        }
    }

    /// Serve the cached copy now and refresh it in the background.
    ///
    /// Without a cached copy the caller waits for the refresh itself.
    pub async fn stale_while_revalidate(&self, request: &FetchRequest) -> FetchResponse {
        let cached = self.lookup(&self.dynamic_area, request).await;
        let refresh = tokio::spawn(self.clone().revalidate(request.clone()));

        if let Some(hit) = cached {
            tracing::debug!(url = %request.url, "serving stale copy while revalidating");
            return hit;
        }

        match refresh.await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => self.offline_fallback(request).await,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "revalidation task failed");
                self.offline_fallback(request).await
            }
        }
    }

    async fn revalidate(self, request: FetchRequest) -> Result<FetchResponse, Error> {
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(&self.dynamic_area, &request, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed");
                Err(e)
            }
        }
    }

    /// Cached shell for documents, else the offline page; plain 503 for the rest.
    async fn offline_fallback(&self, request: &FetchRequest) -> FetchResponse {
        if !request.is_document() {
            return offline::unavailable(&request.url, "Network error");
        }
        match self.cached_shell().await {
            Some(shell) => shell,
            None => offline::offline_page(&request.url, &self.app_name),
        }
    }

    async fn cached_shell(&self) -> Option<FetchResponse> {
        let shell = self.shell.as_ref()?;
        self.lookup(&self.static_area, shell).await
    }

    async fn lookup(&self, area: &CacheArea, request: &FetchRequest) -> Option<FetchResponse> {
        match self.db.match_entry(&area.name, &request.cache_key()).await {
            Ok(entry) => entry.map(|e| FetchResponse::from_entry(e, &request.url)),
            Err(e) => {
                tracing::warn!(area = %area.name, url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    async fn lookup_any(&self, request: &FetchRequest) -> Option<FetchResponse> {
        match self.db.match_any(&self.area_prefix, &request.cache_key()).await {
            Ok(entry) => entry.map(|e| FetchResponse::from_entry(e, &request.url)),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write a snapshot; failures never reach the caller.
    async fn store(&self, area: &CacheArea, request: &FetchRequest, response: &FetchResponse) {
        let entry = response.to_entry(request);
        if let Err(e) = self.db.put_entry(area, &entry).await {
            tracing::warn!(area = %area.name, url = %request.url, error = %e, "cache write failed");
        }
    }

    pub fn static_area(&self) -> &CacheArea {
        &self.static_area
    }

    pub fn dynamic_area(&self) -> &CacheArea {
        &self.dynamic_area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Destination, ResponseSource};
    use crate::testing::ScriptedFetch;
    use std::time::Duration;

    fn config() -> AppConfig {
        AppConfig { origin: "https://promo.example.com".into(), area_prefix: "promo-".into(), ..Default::default() }
    }

    async fn executor(fetch: ScriptedFetch) -> (StrategyExecutor, Arc<ScriptedFetch>, CacheDb) {
        let fetch = Arc::new(fetch);
        let db = CacheDb::open_in_memory().await.unwrap();
        let exec = StrategyExecutor::new(fetch.clone(), db.clone(), &config()).unwrap();
        (exec, fetch, db)
    }

    async fn wait_for_body(db: &CacheDb, area: &str, request: &FetchRequest, body: &[u8]) {
        for _ in 0..100 {
            if let Ok(Some(entry)) = db.match_entry(area, &request.cache_key()).await
                && entry.body == body
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("area {area} never stored {:?}", String::from_utf8_lossy(body));
    }

    #[tokio::test]
    async fn test_cache_first_fetches_once() {
        let (exec, fetch, db) = executor(ScriptedFetch::offline().then_ok("<html>shell</html>")).await;
        let request = FetchRequest::navigate("https://promo.example.com/index.html").unwrap();

        let first = exec.cache_first(&request).await;
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(fetch.calls(), 1);
        assert_eq!(db.entry_count(&exec.static_area().name).await.unwrap(), 1);

        let second = exec.cache_first(&request).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.text(), "<html>shell</html>");
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_error_status_not_stored() {
        let (exec, _fetch, db) = executor(ScriptedFetch::offline().then_status(404, "missing")).await;
        let request = FetchRequest::get("https://promo.example.com/manifest.json").unwrap();

        let response = exec.cache_first(&request).await;
        assert_eq!(response.status.as_u16(), 404);
        assert_eq!(db.entry_count(&exec.static_area().name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_offline_serves_shell() {
        let (exec, _fetch, db) = executor(ScriptedFetch::offline()).await;
        let shell = FetchRequest::navigate("https://promo.example.com/index.html").unwrap();
        let snapshot = FetchResponse::synthesized(&shell.url, reqwest::StatusCode::OK, "text/html", "<html>shell</html>");
        db.put_entry(exec.static_area(), &snapshot.to_entry(&shell)).await.unwrap();

        let request = FetchRequest::navigate("https://promo.example.com/").unwrap();
        let response = exec.cache_first(&request).await;
        assert_eq!(response.text(), "<html>shell</html>");
        assert_eq!(response.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_cache_first_offline_without_shell() {
        let (exec, _fetch, _db) = executor(ScriptedFetch::offline()).await;
        let request = FetchRequest::get("https://promo.example.com/manifest.json").unwrap();

        let response = exec.cache_first(&request).await;
        assert_eq!(response.status.as_u16(), 503);
        assert_eq!(response.text(), "Offline");
    }

    #[tokio::test]
    async fn test_network_first_stores_fresh_copy() {
        let (exec, _fetch, db) = executor(ScriptedFetch::offline().then_ok("rows-v2")).await;
        let request = FetchRequest::get("https://promo.example.com/data/catalog.xlsx").unwrap();

        let response = exec.network_first(&request).await;
        assert_eq!(response.text(), "rows-v2");
        let stored = db.match_entry(&exec.dynamic_area().name, &request.cache_key()).await.unwrap();
        assert_eq!(stored.unwrap().body, b"rows-v2");
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let (exec, _fetch, _db) = executor(ScriptedFetch::offline().then_ok("rows-v1").then_fail()).await;
        let request = FetchRequest::get("https://promo.example.com/data/catalog.xlsx").unwrap();

        exec.network_first(&request).await;
        let response = exec.network_first(&request).await;
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.text(), "rows-v1");
    }

    #[tokio::test]
    async fn test_network_first_error_status_prefers_cache() {
        let (exec, _fetch, _db) = executor(ScriptedFetch::offline().then_ok("rows-v1").then_status(500, "boom")).await;
        let request = FetchRequest::get("https://promo.example.com/data/catalog.xlsx").unwrap();

        exec.network_first(&request).await;
        let response = exec.network_first(&request).await;
        assert_eq!(response.text(), "rows-v1");
    }

    #[tokio::test]
    async fn test_network_first_offline_document() {
        let (exec, _fetch, _db) = executor(ScriptedFetch::offline()).await;
        let request = FetchRequest::parse("GET", "https://promo.example.com/deals", Destination::Document).unwrap();

        let response = exec.network_first(&request).await;
        assert!(response.content_type.as_deref().unwrap().starts_with("text/html"));
        assert!(response.text().contains(offline::OFFLINE_MARKER));
    }

    #[tokio::test]
    async fn test_network_first_offline_other() {
        let (exec, _fetch, _db) = executor(ScriptedFetch::offline()).await;
        let request = FetchRequest::get("https://promo.example.com/data/catalog.xlsx").unwrap();

        let response = exec.network_first(&request).await;
        assert_eq!(response.status.as_u16(), 503);
        assert_eq!(response.text(), "Network error");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_sequence() {
        let (exec, fetch, db) = executor(ScriptedFetch::offline().then_ok("A").then_ok("B")).await;
        let request = FetchRequest::get("https://promo.example.com/img/banner.png").unwrap();

        let first = exec.stale_while_revalidate(&request).await;
        assert_eq!(first.text(), "A");
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(fetch.calls(), 1);

        let second = exec.stale_while_revalidate(&request).await;
        assert_eq!(second.text(), "A");
        assert_eq!(second.source, ResponseSource::Cache);

        wait_for_body(&db, &exec.dynamic_area().name, &request, b"B").await;
        assert_eq!(fetch.calls(), 2);

        let third = exec.stale_while_revalidate(&request).await;
        assert_eq!(third.text(), "B");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_swallows_background_failure() {
        let (exec, _fetch, db) = executor(ScriptedFetch::offline().then_ok("A").then_fail()).await;
        let request = FetchRequest::get("https://promo.example.com/styles.css").unwrap();

        exec.stale_while_revalidate(&request).await;
        let second = exec.stale_while_revalidate(&request).await;
        assert_eq!(second.text(), "A");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = db.match_entry(&exec.dynamic_area().name, &request.cache_key()).await.unwrap();
        assert_eq!(stored.unwrap().body, b"A");
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_fail_response() {
        let (exec, fetch, db) = executor(ScriptedFetch::offline().then_ok("fresh").then_ok("fresh-again")).await;
        db.clone().close().await.unwrap();
        let request = FetchRequest::get("https://promo.example.com/index.html").unwrap();

        let response = exec.cache_first(&request).await;
        assert_eq!(response.text(), "fresh");

        let response = exec.stale_while_revalidate(&request).await;
        assert_eq!(response.text(), "fresh-again");
        assert_eq!(fetch.calls(), 2);
    }

    #[tokio::test]
    async fn test_execute_bypass_is_none() {
        let (exec, fetch, _db) = executor(ScriptedFetch::offline()).await;
        let request = FetchRequest::get("https://promo.example.com/").unwrap();
        assert!(exec.execute(Strategy::Bypass, &request).await.is_none());
        assert_eq!(fetch.calls(), 0);
    }
}
