//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker's event entry points and to the cache inspection tools.
use std::sync::Arc;

use crate::tools::cache::{CacheAreasParams, CacheGetParams, areas_impl, get_impl};
use crate::tools::events::{SwPushParams, SwSyncParams, push_impl, sync_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::message::{SwMessageParams, message_impl};
use precache_client::Worker;
use precache_core::CacheDb;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for precache.
#[derive(Clone)]
pub struct PrecacheServer {
    worker: Arc<Worker>,
    db: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl PrecacheServer {
    /// Create a server for an activated worker and the store it writes to.
    pub fn new(worker: Arc<Worker>, db: CacheDb) -> Self {
        Self { worker, db, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Dispatch a request through the worker. Reports the chosen strategy and the response, or that the request is not intercepted."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(
        description = "Post a page message (SKIP_WAITING, GET_VERSION, CLEAR_CACHE, SYNC_TRIGGER) to the worker and return its reply, if any."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Fire a background sync event. Refreshes the live data file when the tag matches.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push payload and return the notification it produced.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "List the cache areas of this application with their entry counts.")]
    async fn cache_areas(&self, params: Parameters<CacheAreasParams>) -> Result<CallToolResult, McpError> {
        areas_impl(&self.db, &self.worker.config().area_prefix, params.0).await
    }

    #[tool(description = "Look up the newest stored response for a URL across this application's areas.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, &self.worker.config().area_prefix, params.0).await
    }
}

impl ServerHandler for PrecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "precache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_worker;

    #[tokio::test]
    async fn test_lists_worker_tools() {
        let (worker, db) = test_worker().await;
        let server = PrecacheServer::new(worker, db);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_areas", "cache_get", "sw_fetch", "sw_message", "sw_push", "sw_sync"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, db) = test_worker().await;
        let info = PrecacheServer::new(worker, db).get_info();
        assert_eq!(info.server_info.name, "precache");
    }
}
