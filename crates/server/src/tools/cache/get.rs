//! cache_get tool implementation.
//!
//! Retrieves the newest stored response for a request across this
//! application's areas.

use precache_client::{Destination, FetchRequest};
use precache_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The URL of the stored response.
    pub url: String,

    /// HTTP method of the stored request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub method: String,
    /// Request identity the entry is stored under.
    pub key_hash: String,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    /// Body as text, lossily.
    pub body: String,
    pub body_bytes: usize,
    /// RFC 3339 time the entry was written.
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, prefix: &str, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = FetchRequest::parse(&params.method, &params.url, Destination::Other)?;

    let entry = cache
        .match_any(prefix, &request.cache_key())
        .await?
        .ok_or_else(|| Error::NoCachedCopy(request.url.to_string()))?;

    let output = CacheGetOutput {
        url: entry.url,
        method: entry.method,
        key_hash: entry.key_hash,
        status_code: entry.status_code,
        headers: entry.headers,
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        body_bytes: entry.body.len(),
        stored_at: entry.stored_at,
    };

    json_result(&output)
}
