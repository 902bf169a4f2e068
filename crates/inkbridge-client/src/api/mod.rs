//! Notification REST API client.
//!
//! Provides typed access to the notification endpoints with automatic
//! Bearer token injection.

pub mod models;
mod request;


use async_trait::async_trait;

pub use models::{Notification, NotificationKind, NotificationPage};

use crate::ClientError;

/// The authoritative notification store.
///
/// The coordinator talks to the server only through this trait so the
/// transport can be swapped in tests.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// `GET /notifications`
    async fn fetch_notifications(&self) -> Result<NotificationPage, ClientError>;

    /// `PUT /notifications/{id}/read`
    async fn mark_as_read(&self, id: &str) -> Result<(), ClientError>;

    /// `PUT /notifications/read-all`
    async fn mark_all_as_read(&self) -> Result<(), ClientError>;

    /// `DELETE /notifications/{id}`
    async fn delete_notification(&self, id: &str) -> Result<(), ClientError>;

    /// `GET /notifications/unread-count`
    async fn unread_count(&self) -> Result<u64, ClientError>;
}

/// HTTP implementation of [`NotificationStore`].
pub struct NotificationApi {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[async_trait]
impl NotificationStore for NotificationApi {
    async fn fetch_notifications(&self) -> Result<NotificationPage, ClientError> {
        let body = self.authenticated_get("/notifications").await?;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Notification list is not JSON, treating as empty");
            serde_json::Value::Null
        });
        Ok(NotificationPage::from_value(&value))
    }

    async fn mark_as_read(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("/notifications/{}/read", encode_segment(id));
        self.authenticated_put_no_body(&path).await?;
        Ok(())
    }

    async fn mark_all_as_read(&self) -> Result<(), ClientError> {
        self.authenticated_put_no_body("/notifications/read-all")
            .await?;
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> Result<(), ClientError> {
        let path = format!("/notifications/{}", encode_segment(id));
        self.authenticated_delete(&path).await
    }

    async fn unread_count(&self) -> Result<u64, ClientError> {
        let body = self.authenticated_get("/notifications/unread-count").await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        Ok(parse_unread_count(&value))
    }
}

/// The unread-count endpoint answers `{unreadCount}` or, on older servers, `{count}`.
fn parse_unread_count(value: &serde_json::Value) -> u64 {
    if value.get("unreadCount").is_some() {
        models::unread_count_field(value, "unreadCount")
    } else {
        models::unread_count_field(value, "count")
    }
}

fn encode_segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}
