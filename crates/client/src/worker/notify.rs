//! Push payloads and the notifications built from them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use precache_core::Error;

/// Optional fields a push payload may carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub vibrate: Vec<u32>,
    /// The raw payload, handed back on click.
    pub data: Value,
    pub actions: Vec<NotificationAction>,
}

/// Action id of the "open the catalog" button.
pub const VIEW_ACTION: &str = "view";

/// Displays notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that only logs; used where no display surface exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "notification");
        Ok(())
    }
}

/// Fill in a notification from a parsed payload and the configured defaults.
pub fn build_notification(
    data: Value, payload: PushPayload, default_title: &str, default_body: &str, icon: Option<&str>,
) -> Notification {
    let icon = icon.map(str::to_string);
    Notification {
        title: payload.title.unwrap_or_else(|| default_title.to_string()),
        body: payload.body.unwrap_or_else(|| default_body.to_string()),
        icon: icon.clone(),
        badge: icon.clone(),
        vibrate: vec![200, 100, 200],
        data,
        actions: vec![NotificationAction { action: VIEW_ACTION.into(), title: "View Deals".into(), icon }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let data = json!({"body": "Half price"});
        let payload: PushPayload = serde_json::from_value(data.clone()).unwrap();
        let n = build_notification(data, payload, "Deals", "Fallback", Some("/icon.png"));
        assert_eq!(n.title, "Deals");
        assert_eq!(n.body, "Half price");
        assert_eq!(n.badge.as_deref(), Some("/icon.png"));
        assert_eq!(n.actions[0].action, VIEW_ACTION);
    }

    #[tokio::test]
    async fn test_log_notifier() {
        let n = build_notification(json!({}), PushPayload::default(), "t", "b", None);
        assert!(LogNotifier.show_notification(&n).await.is_ok());
    }
}
