//! sw_sync and sw_push tool implementations.

use precache_client::Worker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag (default: the configured sync tag).
    #[serde(default)]
    pub tag: Option<String>,
}

/// Output structure for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    /// Whether fresh data was fetched and stored.
    pub synced: bool,
    /// Events broadcast to controlled pages during the sync.
    pub events: Vec<Value>,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(worker: &Worker, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| worker.config().sync_tag.clone());
    let mut receiver = worker.subscribe();

    let synced = worker.handle_sync(&tag).await;

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let Ok(value) = serde_json::to_value(&event) {
            events.push(value);
        }
    }

    json_result(&SwSyncOutput { tag, synced, events })
}

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push payload, normally JSON `{"title": ..., "body": ...}`.
    #[serde(default)]
    pub payload: Option<String>,

    /// Simulate a click on the shown notification with this action id.
    #[serde(default)]
    pub click_action: Option<String>,
}

/// Output structure for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    /// The notification shown, if the payload produced one.
    pub notification: Option<Value>,
    /// Page opened by the simulated click.
    pub open_url: Option<String>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &Worker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.handle_push(params.payload.as_deref()).await;

    let open_url = match (&notification, params.click_action.as_deref()) {
        (Some(_), action) => worker.handle_notification_click(action).map(|url| url.to_string()),
        (None, _) => None,
    };

    let notification = notification
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| McpError::internal_error(format!("failed to serialize notification: {e}"), None))?;

    json_result(&SwPushOutput { notification, open_url })
}
