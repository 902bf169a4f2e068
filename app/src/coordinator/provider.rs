//! Access point for consumers that may run without a live coordinator.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use inkbridge_client::realtime::ConnectionState;

use super::{Coordinator, NotificationSnapshot};

/// Consumer-facing notification surface.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    fn snapshot(&self) -> NotificationSnapshot;

    fn connection_state(&self) -> ConnectionState;

    fn set_active_conversation(&self, conversation_id: Option<String>);

    async fn mark_as_read(&self, id: &str) -> bool;

    async fn mark_all_as_read(&self) -> bool;

    async fn fetch_notifications(&self) -> bool;

    async fn remove_notification(&self, id: &str) -> bool;

    async fn refresh_unread_count(&self) -> Option<u64>;
}

#[async_trait]
impl NotificationCenter for Coordinator {
    fn snapshot(&self) -> NotificationSnapshot {
        Coordinator::snapshot(self)
    }

    fn connection_state(&self) -> ConnectionState {
        Coordinator::connection_state(self)
    }

    fn set_active_conversation(&self, conversation_id: Option<String>) {
        Coordinator::set_active_conversation(self, conversation_id)
    }

    async fn mark_as_read(&self, id: &str) -> bool {
        Coordinator::mark_as_read(self, id).await
    }

    async fn mark_all_as_read(&self) -> bool {
        Coordinator::mark_all_as_read(self).await
    }

    async fn fetch_notifications(&self) -> bool {
        Coordinator::fetch_notifications(self).await
    }

    async fn remove_notification(&self, id: &str) -> bool {
        Coordinator::remove_notification(self, id).await
    }

    async fn refresh_unread_count(&self) -> Option<u64> {
        Coordinator::refresh_unread_count(self).await
    }
}

/// Stand-in used when no coordinator is installed: empty values, no-ops.
pub struct DetachedCenter;

#[async_trait]
impl NotificationCenter for DetachedCenter {
    fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot::default()
    }

    fn connection_state(&self) -> ConnectionState {
        ConnectionState::Disconnected
    }

    fn set_active_conversation(&self, _conversation_id: Option<String>) {}

    async fn mark_as_read(&self, _id: &str) -> bool {
        false
    }

    async fn mark_all_as_read(&self) -> bool {
        false
    }

    async fn fetch_notifications(&self) -> bool {
        false
    }

    async fn remove_notification(&self, _id: &str) -> bool {
        false
    }

    async fn refresh_unread_count(&self) -> Option<u64> {
        None
    }
}

/// Holds the live coordinator, if any.
#[derive(Default)]
pub struct NotificationProvider {
    slot: RwLock<Option<Arc<dyn NotificationCenter>>>,
}

impl NotificationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, center: Arc<dyn NotificationCenter>) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(center);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// The installed center, or a [`DetachedCenter`]. Never fails.
    pub fn center(&self) -> Arc<dyn NotificationCenter> {
        self.slot
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .unwrap_or_else(|| Arc::new(DetachedCenter))
    }
}
