//! cache_areas tool implementation.
//!
//! Lists cache areas with their entry counts.

use precache_core::CacheDb;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_areas tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheAreasParams {
    /// Also list areas that belong to other applications.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AreaSummary {
    pub name: String,
    pub entries: u64,
}

/// Output from the cache_areas tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheAreasOutput {
    pub areas: Vec<AreaSummary>,
}

/// Implementation of the cache_areas tool.
pub async fn areas_impl(cache: &CacheDb, prefix: &str, params: CacheAreasParams) -> Result<CallToolResult, McpError> {
    let mut names = cache.area_names().await?;
    if !params.all {
        names.retain(|name| name.starts_with(prefix));
    }
    names.sort();

    let mut areas = Vec::with_capacity(names.len());
    for name in names {
        let entries = cache.entry_count(&name).await?;
        areas.push(AreaSummary { name, entries });
    }

    json_result(&CacheAreasOutput { areas })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{result_json, test_worker};
    use precache_core::{AreaPurpose, CacheArea};
    use serde_json::json;

    #[tokio::test]
    async fn test_lists_own_areas_with_counts() {
        let (_worker, db) = test_worker().await;
        db.open_area(&CacheArea::new("other-app-v1", AreaPurpose::Static)).await.unwrap();

        let result = areas_impl(&db, "promo-", CacheAreasParams::default()).await.unwrap();
        assert_eq!(result_json(&result), json!({"areas": [{"name": "promo-static-v2.0", "entries": 3}]}));

        let result = areas_impl(&db, "promo-", CacheAreasParams { all: true }).await.unwrap();
        assert_eq!(result_json(&result)["areas"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let db = CacheDb::open_in_memory().await.unwrap();

        let result = areas_impl(&db, "promo-", CacheAreasParams::default()).await.unwrap();
        assert_eq!(result_json(&result), json!({"areas": []}));
    }
}
