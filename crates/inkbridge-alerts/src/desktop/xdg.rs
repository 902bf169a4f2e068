//! freedesktop.org notifications through `notify-rust`.
//!
//! Tags map to server notification ids so a repeated tag replaces the
//! notification in place. The server owns expiry; `close` only forgets
//! the tag.

use notify_rust::{Notification, Timeout};

use super::server_ids::{Claim, ServerIds};
use super::{
    ActivateHook, DesktopBackend, DesktopContent, DesktopError, DesktopHandle, PermissionStatus,
};

const DISPLAY_TIMEOUT_MS: u32 = 8000;
const DEFAULT_ACTION: &str = "default";

type FocusHook = Box<dyn Fn() + Send + Sync>;

pub struct XdgDesktop {
    app_name: String,
    supported: bool,
    ids: ServerIds,
    focus: Option<FocusHook>,
}

impl XdgDesktop {
    pub fn new(app_name: impl Into<String>) -> Self {
        let supported = match notify_rust::get_server_information() {
            Ok(info) => {
                tracing::info!(server = %info.name, "Notification server found");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "No notification server on the session bus");
                false
            }
        };
        Self {
            app_name: app_name.into(),
            supported,
            ids: ServerIds::default(),
            focus: None,
        }
    }

    /// Install the callback that raises the application window.
    pub fn with_focus_hook(mut self, focus: impl Fn() + Send + Sync + 'static) -> Self {
        self.focus = Some(Box::new(focus));
        self
    }
}

struct XdgHandle {
    tag: String,
    claim: Option<Claim>,
    ids: ServerIds,
}

impl DesktopHandle for XdgHandle {
    fn close(&self) {
        if let Some(claim) = self.claim {
            self.ids.release(&self.tag, claim);
        }
    }
}

impl DesktopBackend for XdgDesktop {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> PermissionStatus {
        if self.supported {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Unsupported
        }
    }

    fn request_permission(&self) -> PermissionStatus {
        self.permission()
    }

    fn show(
        &self,
        content: &DesktopContent,
        activate: ActivateHook,
    ) -> Result<Box<dyn DesktopHandle>, DesktopError> {
        if !self.supported {
            return Err(DesktopError::Unsupported);
        }
        let previous_id = self.ids.replacement_for(&content.tag);

        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&content.title)
            .body(&content.body)
            .action(DEFAULT_ACTION, "Open")
            .timeout(Timeout::Milliseconds(DISPLAY_TIMEOUT_MS));
        if let Some(id) = previous_id {
            notification.id(id);
        }

        let handle = notification
            .show()
            .map_err(|e| DesktopError::Show(e.to_string()))?;
        let claim = self.ids.claim(&content.tag, handle.id());

        let tag = content.tag.clone();
        std::thread::Builder::new()
            .name("inkbridge-notify-action".into())
            .spawn(move || {
                handle.wait_for_action(|action| {
                    if action == DEFAULT_ACTION {
                        activate();
                    }
                });
            })
            .map_err(|e| DesktopError::Show(e.to_string()))?;

        Ok(Box::new(XdgHandle {
            tag,
            claim,
            ids: self.ids.clone(),
        }))
    }

    fn focus_app(&self) {
        match &self.focus {
            Some(focus) => focus(),
            None => tracing::debug!("No focus hook installed"),
        }
    }
}
