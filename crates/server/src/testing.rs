//! Worker fixtures for the tool tests.

use std::sync::Arc;

use precache_client::Worker;
use precache_client::testing::ScriptedFetch;
use precache_core::{AppConfig, CacheDb};
use rmcp::model::CallToolResult;

pub(crate) fn config() -> AppConfig {
    AppConfig {
        origin: "https://promo.example.com".into(),
        area_prefix: "promo-".into(),
        version: "2.0".into(),
        ..Default::default()
    }
}

/// An installed and activated worker over an in-memory store.
pub(crate) async fn worker_with(fetch: ScriptedFetch) -> (Arc<Worker>, CacheDb) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let worker = Worker::new(config(), db.clone(), Arc::new(fetch)).unwrap();
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    (Arc::new(worker), db)
}

/// The static assets are reachable; everything else is offline.
pub(crate) fn site() -> ScriptedFetch {
    ScriptedFetch::offline()
        .route("/", 200, "<html>home</html>")
        .route("/index.html", 200, "<html>home</html>")
        .route("/manifest.json", 200, "{}")
}

pub(crate) async fn test_worker() -> (Arc<Worker>, CacheDb) {
    worker_with(site()).await
}

/// Parse the JSON text of a tool result.
pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).unwrap();
    serde_json::from_str(text).unwrap()
}
