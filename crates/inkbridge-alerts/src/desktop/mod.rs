//! OS-level notifications for background delivery.
//!
//! Notifications are raised only while the app is not visible, are keyed
//! by tag (a new notification replaces an active one with the same tag),
//! and are tracked until clicked or closed.

mod chat;
#[cfg_attr(not(all(feature = "desktop", target_os = "linux")), allow(dead_code))]
mod server_ids;
#[cfg(test)]
mod tests;
#[cfg(all(feature = "desktop", target_os = "linux"))]
mod xdg;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;

use crate::visibility::VisibilityTracker;

pub use chat::{CHAT_PREVIEW_LENGTH, ChatBody, chat_message_notification};
#[cfg(all(feature = "desktop", target_os = "linux"))]
pub use xdg::XdgDesktop;

/// Callback run when the user clicks a notification.
pub type ClickAction = Box<dyn FnOnce() + Send + 'static>;

/// Hook a backend invokes when its notification is activated.
pub type ActivateHook = Box<dyn Fn() + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Default,
    Unsupported,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
            Self::Unsupported => "unsupported",
        }
    }
}

/// What the backend renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopContent {
    pub title: String,
    pub body: String,
    pub tag: String,
}

/// A notification to raise, with an optional click action.
pub struct DesktopRequest {
    pub content: DesktopContent,
    pub on_click: Option<ClickAction>,
}

impl DesktopRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            content: DesktopContent {
                title: title.into(),
                body: body.into(),
                tag: tag.into(),
            },
            on_click: None,
        }
    }

    pub fn with_on_click(mut self, on_click: impl FnOnce() + Send + 'static) -> Self {
        self.on_click = Some(Box::new(on_click));
        self
    }
}

impl fmt::Debug for DesktopRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopRequest")
            .field("content", &self.content)
            .field("on_click", &self.on_click.is_some())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DesktopError {
    #[error("desktop notifications unsupported")]
    Unsupported,

    #[error("notification failed: {0}")]
    Show(String),
}

/// A notification currently on screen.
pub trait DesktopHandle: Send + Sync {
    fn close(&self);
}

/// Platform notification service.
pub trait DesktopBackend: Send + Sync {
    fn is_supported(&self) -> bool;

    fn permission(&self) -> PermissionStatus;

    /// Prompt the user. Only called while the status is `Default`.
    fn request_permission(&self) -> PermissionStatus;

    /// Display `content`; call `activate` when the user clicks it.
    fn show(
        &self,
        content: &DesktopContent,
        activate: ActivateHook,
    ) -> Result<Box<dyn DesktopHandle>, DesktopError>;

    /// Bring the application window to the foreground.
    fn focus_app(&self);
}

/// Backend for platforms or builds without OS notifications.
pub struct UnsupportedDesktop;

impl DesktopBackend for UnsupportedDesktop {
    fn is_supported(&self) -> bool {
        false
    }

    fn permission(&self) -> PermissionStatus {
        PermissionStatus::Unsupported
    }

    fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Unsupported
    }

    fn show(
        &self,
        _content: &DesktopContent,
        _activate: ActivateHook,
    ) -> Result<Box<dyn DesktopHandle>, DesktopError> {
        Err(DesktopError::Unsupported)
    }

    fn focus_app(&self) {}
}

/// Receipt for a notification that was actually displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub tag: String,
    serial: u64,
}

struct ActiveEntry {
    serial: u64,
    handle: Box<dyn DesktopHandle>,
    on_click: Option<ClickAction>,
}

pub struct DesktopNotifier {
    backend: Arc<dyn DesktopBackend>,
    visibility: Arc<VisibilityTracker>,
    active: Mutex<HashMap<String, ActiveEntry>>,
    next_serial: AtomicU64,
    this: Weak<DesktopNotifier>,
}

impl DesktopNotifier {
    pub fn new(backend: Arc<dyn DesktopBackend>, visibility: Arc<VisibilityTracker>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            backend,
            visibility,
            active: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
            this: this.clone(),
        })
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    pub fn permission_status(&self) -> PermissionStatus {
        if !self.backend.is_supported() {
            return PermissionStatus::Unsupported;
        }
        self.backend.permission()
    }

    /// Returns whether notifications may be shown. Never prompts once the
    /// user has denied them.
    pub fn request_permission(&self) -> bool {
        match self.permission_status() {
            PermissionStatus::Granted => true,
            PermissionStatus::Denied | PermissionStatus::Unsupported => false,
            PermissionStatus::Default => {
                let outcome = self.backend.request_permission();
                tracing::info!(permission = outcome.as_str(), "Notification permission requested");
                outcome == PermissionStatus::Granted
            }
        }
    }

    /// Raise a notification while the page is hidden. Returns `None` when
    /// the page is visible or nothing could be shown.
    pub fn show_notification(&self, request: DesktopRequest) -> Option<ShownNotification> {
        if self.visibility.is_page_visible() {
            tracing::trace!(tag = %request.content.tag, "Page visible, OS notification skipped");
            return None;
        }
        let permission = self.permission_status();
        if permission != PermissionStatus::Granted {
            tracing::debug!(permission = permission.as_str(), "OS notification not permitted");
            return None;
        }

        let DesktopRequest { content, on_click } = request;
        let tag = content.tag.clone();
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let hook = {
            let this = self.this.clone();
            let tag = tag.clone();
            Box::new(move || {
                if let Some(notifier) = this.upgrade() {
                    notifier.activate(&tag, Some(serial));
                }
            })
        };

        let handle = match self.backend.show(&content, hook) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(tag = %tag, error = %e, "Failed to show OS notification");
                return None;
            }
        };

        let replaced = self.active.lock().ok().and_then(|mut active| {
            active.insert(
                tag.clone(),
                ActiveEntry {
                    serial,
                    handle,
                    on_click,
                },
            )
        });
        if let Some(previous) = replaced {
            tracing::debug!(tag = %tag, "Replacing OS notification with same tag");
            previous.handle.close();
        }
        Some(ShownNotification { tag, serial })
    }

    /// Host-side click entry point.
    pub fn handle_click(&self, tag: &str) -> bool {
        self.activate(tag, None)
    }

    /// Focus the app, run the click action, then close the notification.
    fn activate(&self, tag: &str, serial: Option<u64>) -> bool {
        let entry = {
            let Ok(mut active) = self.active.lock() else {
                return false;
            };
            match active.get(tag) {
                Some(entry) if serial.is_none_or(|s| s == entry.serial) => active.remove(tag),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            tracing::debug!(tag, "Click on a notification that is no longer active");
            return false;
        };

        self.backend.focus_app();
        if let Some(on_click) = entry.on_click {
            on_click();
        }
        entry.handle.close();
        true
    }

    pub fn close(&self, tag: &str) -> bool {
        let entry = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.remove(tag));
        match entry {
            Some(entry) => {
                entry.handle.close();
                true
            }
            None => false,
        }
    }

    pub fn close_all(&self) -> usize {
        let entries: Vec<ActiveEntry> = match self.active.lock() {
            Ok(mut active) => active.drain().map(|(_, entry)| entry).collect(),
            Err(_) => return 0,
        };
        for entry in &entries {
            entry.handle.close();
        }
        entries.len()
    }

    pub fn active_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .active
            .lock()
            .map(|active| active.keys().cloned().collect())
            .unwrap_or_default();
        tags.sort();
        tags
    }
}

impl ShownNotification {
    pub fn serial(&self) -> u64 {
        self.serial
    }
}
