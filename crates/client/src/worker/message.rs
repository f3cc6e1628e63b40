//! Messages exchanged between controlled pages and the worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape of a page-to-worker message: `{type, data?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A command from a controlled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    SkipWaiting,
    GetVersion,
    ClearCache,
    /// Run the background sync now; `tag` defaults to the configured one.
    SyncTrigger { tag: Option<String> },
    Unknown(String),
}

impl From<RawMessage> for ClientMessage {
    fn from(raw: RawMessage) -> Self {
        match raw.kind.as_str() {
            "SKIP_WAITING" => ClientMessage::SkipWaiting,
            "GET_VERSION" => ClientMessage::GetVersion,
            "CLEAR_CACHE" => ClientMessage::ClearCache,
            "SYNC_TRIGGER" => {
                let tag = raw
                    .data
                    .as_ref()
                    .and_then(|d| d.get("tag"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                ClientMessage::SyncTrigger { tag }
            }
            _ => ClientMessage::Unknown(raw.kind),
        }
    }
}

/// Reply posted back on a message's reply channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageReply {
    Version { version: String },
    Success { success: bool },
}

/// Broadcast from the worker to every controlled page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEvent {
    DataUpdated { message: String },
}
