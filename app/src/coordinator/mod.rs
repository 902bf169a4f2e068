//! Real-time notification coordinator.
//!
//! Owns the notification list and unread count for one signed-in user,
//! consumes the realtime event stream in delivery order and announces
//! each qualifying event on exactly one channel: a sound while the app is
//! visible, an OS notification while it is hidden.

mod builders;
pub mod provider;
mod routing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use inkbridge_alerts::{DesktopNotifier, SoundManager, Subscription, VisibilityTracker};
use inkbridge_client::ClientError;
use inkbridge_client::api::{Notification, NotificationStore};
use inkbridge_client::realtime::{
    ConnectionState, RealtimeClient, RealtimeConfig, RealtimeEvent, RealtimeSession,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::navigation::Navigator;

use builders::AgreementChange;

pub use provider::{DetachedCenter, NotificationCenter, NotificationProvider};
pub use routing::{Delivery, Suppression};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// What consumers render: the list (newest first), the unread badge and
/// the connection flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub connected: bool,
}

/// Services the coordinator delivers through.
#[derive(Clone)]
pub struct CoordinatorDeps {
    pub store: Arc<dyn NotificationStore>,
    pub visibility: Arc<VisibilityTracker>,
    pub sound: Arc<SoundManager>,
    pub desktop: Arc<DesktopNotifier>,
    pub navigator: Arc<dyn Navigator>,
}

struct SessionTasks {
    shutdown: tokio::sync::mpsc::Sender<()>,
    transport_state: watch::Receiver<ConnectionState>,
    pump: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

pub struct Coordinator {
    user_id: String,
    store: Arc<dyn NotificationStore>,
    visibility: Arc<VisibilityTracker>,
    sound: Arc<SoundManager>,
    desktop: Arc<DesktopNotifier>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<NotificationSnapshot>,
    connection: watch::Sender<ConnectionState>,
    active_conversation: RwLock<Option<String>>,
    visibility_sub: Mutex<Option<Subscription>>,
    session: Mutex<Option<SessionTasks>>,
    shut_down: AtomicBool,
}

impl Coordinator {
    /// Create the coordinator and subscribe it to visibility changes.
    pub fn new(user_id: impl Into<String>, deps: CoordinatorDeps) -> Arc<Self> {
        let CoordinatorDeps {
            store,
            visibility,
            sound,
            desktop,
            navigator,
        } = deps;
        Arc::new_cyclic(|this: &Weak<Self>| {
            let weak = this.clone();
            let subscription = visibility.on_visibility_change(move |visible| {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.on_visibility_change(visible);
                }
            });
            Self {
                user_id: user_id.into(),
                store,
                visibility,
                sound,
                desktop,
                navigator,
                state: watch::Sender::new(NotificationSnapshot::default()),
                connection: watch::Sender::new(ConnectionState::Disconnected),
                active_conversation: RwLock::new(None),
                visibility_sub: Mutex::new(Some(subscription)),
                session: Mutex::new(None),
                shut_down: AtomicBool::new(false),
            }
        })
    }

    /// Seed the list from the server, then open the realtime session.
    pub async fn start(self: &Arc<Self>, config: RealtimeConfig) -> Result<(), ClientError> {
        self.fetch_notifications().await;
        self.apply_connection_state(ConnectionState::Connecting);
        let session = match RealtimeClient::connect(config).await {
            Ok(session) => session,
            Err(e) => {
                self.apply_connection_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };
        self.attach(session);
        tracing::info!(user_id = %self.user_id, "Notification coordinator started");
        Ok(())
    }

    /// Consume a realtime session: one task pumps events in order, another
    /// mirrors the transport state.
    pub fn attach(self: &Arc<Self>, session: RealtimeSession) {
        let RealtimeSession {
            mut events,
            state,
            shutdown,
        } = session;

        // Audio and D-Bus backends block, so each event is handled on the
        // blocking pool. Awaiting it keeps events strictly in order.
        let weak = Arc::downgrade(self);
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                let handled =
                    tokio::task::spawn_blocking(move || coordinator.handle_event(event)).await;
                if let Err(e) = handled {
                    tracing::error!(error = %e, "Realtime event handler failed");
                }
            }
            tracing::debug!("Realtime event stream ended");
        });

        let weak = Arc::downgrade(self);
        let mut state_rx = state.clone();
        let watcher = tokio::spawn(async move {
            loop {
                let current = *state_rx.borrow_and_update();
                match weak.upgrade() {
                    Some(coordinator) => coordinator.apply_connection_state(current),
                    None => return,
                }
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
            if let Some(coordinator) = weak.upgrade() {
                coordinator.apply_connection_state(ConnectionState::Disconnected);
            }
        });

        let previous = self.session.lock().ok().and_then(|mut slot| {
            slot.replace(SessionTasks {
                shutdown,
                transport_state: state,
                pump,
                watcher,
            })
        });
        if let Some(previous) = previous {
            tracing::warn!("Replacing an existing realtime session");
            stop_tasks(previous);
        }
    }

    /// Apply one inbound event. May block on the sound or desktop backend;
    /// the session pump calls it from the blocking pool.
    pub fn handle_event(&self, event: RealtimeEvent) -> Delivery {
        let name = event.name();
        let delivery = match event {
            RealtimeEvent::NewAgreement(e) => {
                self.record(builders::agreement(AgreementChange::Created, &e))
            }
            RealtimeEvent::AgreementAccepted(e) => {
                self.record(builders::agreement(AgreementChange::Accepted, &e))
            }
            RealtimeEvent::AgreementUpdated(e) => {
                self.record(builders::agreement(AgreementChange::Updated, &e))
            }
            RealtimeEvent::PaymentCompleted(e) => self.record(builders::payment(&e)),
            RealtimeEvent::NewMessage(e) => match self.message_suppression(&e) {
                Some(reason) => Delivery::Suppressed(reason),
                None => self.record(builders::message(&e)),
            },
            // Alert only; the canonical newMessage carries the list entry.
            RealtimeEvent::MessageBroadcast(e) => match self.message_suppression(&e) {
                Some(reason) => Delivery::Suppressed(reason),
                None => self.announce(builders::message(&e)),
            },
            RealtimeEvent::DashboardUpdate(_) => {
                tracing::debug!("Dashboard update received");
                Delivery::Ignored
            }
        };
        tracing::debug!(event = name, ?delivery, "Realtime event handled");
        delivery
    }

    /// Prepend the entry and bump the count together, then announce it.
    fn record(&self, draft: builders::Draft) -> Delivery {
        let entry = draft.notification.clone();
        self.state.send_modify(|s| {
            if !entry.read {
                s.unread_count += 1;
            }
            s.notifications.insert(0, entry);
        });
        self.announce(draft)
    }

    /// Persist remotely, then flip the local entry. Returns whether the
    /// server accepted the change.
    pub async fn mark_as_read(&self, id: &str) -> bool {
        if let Err(e) = self.store.mark_as_read(id).await {
            tracing::warn!(id, error = %e, "Failed to mark notification as read");
            return false;
        }
        self.state.send_if_modified(|s| {
            match s.notifications.iter_mut().find(|n| n.id == id) {
                Some(n) if !n.read => {
                    n.read = true;
                    s.unread_count = s.unread_count.saturating_sub(1);
                    true
                }
                _ => false,
            }
        });
        true
    }

    pub async fn mark_all_as_read(&self) -> bool {
        if let Err(e) = self.store.mark_all_as_read().await {
            tracing::warn!(error = %e, "Failed to mark all notifications as read");
            return false;
        }
        self.state.send_modify(|s| {
            for n in &mut s.notifications {
                n.read = true;
            }
            s.unread_count = 0;
        });
        true
    }

    /// Replace the list with the server snapshot, newest first. The unread
    /// count always follows the list; a differing server count is logged.
    pub async fn fetch_notifications(&self) -> bool {
        let mut page = match self.store.fetch_notifications().await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch notifications");
                return false;
            }
        };
        page.notifications
            .sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let unread = unread_in(&page.notifications);
        if unread != page.unread_count {
            tracing::warn!(
                server = page.unread_count,
                listed = unread,
                "Server unread count disagrees with the list, using the list"
            );
        }
        tracing::info!(count = page.notifications.len(), unread, "Notifications fetched");
        self.state.send_modify(|s| {
            s.notifications = page.notifications;
            s.unread_count = unread;
        });
        true
    }

    /// Delete remotely, then drop the local entry.
    pub async fn remove_notification(&self, id: &str) -> bool {
        if let Err(e) = self.store.delete_notification(id).await {
            tracing::warn!(id, error = %e, "Failed to delete notification");
            return false;
        }
        self.state.send_if_modified(|s| {
            let Some(pos) = s.notifications.iter().position(|n| n.id == id) else {
                return false;
            };
            let removed = s.notifications.remove(pos);
            if !removed.read {
                s.unread_count = s.unread_count.saturating_sub(1);
            }
            true
        });
        true
    }

    /// Ask the server for its unread count. When it disagrees with the
    /// local list, re-fetch the list so both move together.
    pub async fn refresh_unread_count(&self) -> Option<u64> {
        let count = match self.store.unread_count().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh unread count");
                return None;
            }
        };
        let local = self.state.borrow().unread_count;
        if count != local {
            tracing::debug!(server = count, local, "Unread count out of date, re-fetching");
            self.fetch_notifications().await;
        }
        Some(count)
    }

    pub fn set_active_conversation(&self, conversation_id: Option<String>) {
        tracing::debug!(conversation = ?conversation_id, "Active conversation set");
        if let Ok(mut active) = self.active_conversation.write() {
            *active = conversation_id;
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.state.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    fn apply_connection_state(&self, state: ConnectionState) {
        let previous = self.connection.send_replace(state);
        if previous != state {
            tracing::info!(?state, "Realtime connection state changed");
        }
        self.state.send_if_modified(|s| {
            let connected = state.is_connected();
            let changed = s.connected != connected;
            s.connected = connected;
            changed
        });
    }

    fn on_visibility_change(&self, visible: bool) {
        if visible {
            let closed = self.desktop.close_all();
            if closed > 0 {
                tracing::debug!(closed, "Page visible, OS notifications closed");
            }
        }
    }

    /// End the session: stop the transport, drop the visibility
    /// subscription and clear all state. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = self.session.lock().ok().and_then(|mut slot| slot.take());
        if let Some(mut session) = session {
            if session.shutdown.send(()).await.is_err() {
                tracing::debug!("Realtime transport already stopped");
            }
            let timed_out = tokio::time::timeout(
                SHUTDOWN_GRACE,
                session
                    .transport_state
                    .wait_for(|s| *s == ConnectionState::Disconnected),
            )
            .await
            .is_err();
            if timed_out {
                tracing::warn!("Realtime transport did not close in time");
            }
            stop_tasks(session);
        }

        if let Some(subscription) = self.visibility_sub.lock().ok().and_then(|mut s| s.take()) {
            subscription.unsubscribe();
        }
        self.desktop.close_all();
        self.set_active_conversation(None);
        self.connection.send_replace(ConnectionState::Disconnected);
        self.state.send_replace(NotificationSnapshot::default());
        tracing::info!(user_id = %self.user_id, "Notification coordinator shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

fn unread_in(notifications: &[Notification]) -> u64 {
    notifications.iter().filter(|n| !n.read).count() as u64
}

fn stop_tasks(session: SessionTasks) {
    let _ = session.shutdown.try_send(());
    session.pump.abort();
    session.watcher.abort();
}
