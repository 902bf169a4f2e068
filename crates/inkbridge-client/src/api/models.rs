use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Notification category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
    Agreement,
    Payment,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Agreement => "agreement",
            Self::Payment => "payment",
            Self::Other => "other",
        }
    }
}

/// A notification as stored by the server and held by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "content", default)]
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Other
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Server snapshot returned by `GET /notifications`, after coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

impl NotificationPage {
    /// Coerce a raw response body into a page.
    ///
    /// A missing or non-array `notifications` field yields an empty list,
    /// entries that fail to parse are skipped, and a missing or non-numeric
    /// `unreadCount` yields zero.
    pub fn from_value(body: &Value) -> Self {
        let notifications = body
            .get("notifications")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match Notification::deserialize(item) {
                        Ok(n) => Some(n),
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping malformed notification entry");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            notifications,
            unread_count: unread_count_field(body, "unreadCount"),
        }
    }
}

/// Read a non-negative count; anything else counts as zero.
pub(crate) fn unread_count_field(body: &Value, key: &str) -> u64 {
    match body.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}
