//! sw_message tool implementation.
//!
//! Posts a page message to the worker with a reply channel attached.

use precache_client::{ClientMessage, RawMessage, Worker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use super::json_result;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type, e.g. "GET_VERSION".
    #[serde(rename = "type")]
    pub kind: String,

    /// Optional message payload, e.g. `{"tag": "background-sync"}` for SYNC_TRIGGER.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Output structure for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// Whether the worker posted a reply.
    pub replied: bool,
    /// The reply, e.g. `{"version": "1.0"}` or `{"success": true}`.
    pub reply: Option<Value>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = ClientMessage::from(RawMessage { kind: params.kind, data: params.data });
    let (tx, rx) = oneshot::channel();

    worker.handle_message(message, Some(tx)).await;

    let reply = match rx.await {
        Ok(reply) => Some(
            serde_json::to_value(reply)
                .map_err(|e| McpError::internal_error(format!("failed to serialize reply: {e}"), None))?,
        ),
        Err(_) => None,
    };

    json_result(&SwMessageOutput { replied: reply.is_some(), reply })
}
