//! sw_fetch tool implementation.
//!
//! Dispatches one request through the worker's router and strategies.

use precache_client::{Destination, FetchRequest, Worker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// The URL requested.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document" for navigations, or "script", "style",
    /// "image", "font", "manifest", "other" (default).
    #[serde(default)]
    pub destination: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The canonical URL requested.
    pub url: String,
    /// Strategy the router picked.
    pub strategy: String,
    /// Whether the worker answered; false means the request goes to the network untouched.
    pub intercepted: bool,
    /// HTTP status of the answer.
    pub status: Option<u16>,
    /// Where the answer came from: "network", "cache", or "synthesized".
    pub source: Option<String>,
    /// Content-Type of the answer.
    pub content_type: Option<String>,
    /// Final URL after redirects.
    pub final_url: Option<String>,
    /// Body as text.
    pub body: Option<String>,
    /// Network time in milliseconds (0 when not fetched).
    pub fetch_ms: Option<u64>,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let destination = params
        .destination
        .as_deref()
        .map(|d| d.parse().unwrap_or_default())
        .unwrap_or(Destination::Other);
    let request = FetchRequest::parse(&params.method, &params.url, destination)?;
    let strategy = worker.classify(&request);

    let output = match worker.handle_fetch(&request).await {
        Some(response) => SwFetchOutput {
            url: request.url.to_string(),
            strategy: strategy.to_string(),
            intercepted: true,
            status: Some(response.status.as_u16()),
            source: Some(response.source.as_str().to_string()),
            content_type: response.content_type.clone(),
            final_url: Some(response.final_url.to_string()),
            body: Some(response.text()),
            fetch_ms: Some(response.fetch_ms),
        },
        None => SwFetchOutput {
            url: request.url.to_string(),
            strategy: strategy.to_string(),
            intercepted: false,
            status: None,
            source: None,
            content_type: None,
            final_url: None,
            body: None,
            fetch_ms: None,
        },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{result_json, test_worker};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), destination: None }
    }

    #[tokio::test]
    async fn test_static_asset_from_cache() {
        let (worker, _db) = test_worker().await;

        let result = fetch_impl(&worker, params("https://promo.example.com/manifest.json")).await.unwrap();
        let output = result_json(&result);
        assert_eq!(output["strategy"], "cache-first");
        assert_eq!(output["intercepted"], true);
        assert_eq!(output["source"], "cache");
        assert_eq!(output["body"], "{}");
    }

    #[tokio::test]
    async fn test_bypassed_request_not_intercepted() {
        let (worker, _db) = test_worker().await;

        let result = fetch_impl(&worker, params("https://fonts.googleapis.com/css2")).await.unwrap();
        let output = result_json(&result);
        assert_eq!(output["strategy"], "bypass");
        assert_eq!(output["intercepted"], false);
        assert!(output["status"].is_null());
    }

    #[tokio::test]
    async fn test_offline_document() {
        let (worker, _db) = test_worker().await;
        let params = SwFetchParams {
            url: "https://promo.example.com/deals/today".into(),
            method: "get".into(),
            destination: Some("document".into()),
        };

        let result = fetch_impl(&worker, params).await.unwrap();
        let output = result_json(&result);
        assert_eq!(output["strategy"], "stale-while-revalidate");
        assert_eq!(output["body"], "<html>home</html>");
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let (worker, _db) = test_worker().await;
        let err = fetch_impl(&worker, params("not a url")).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
