//! Audibility filters and the foreground/background channel choice.

use inkbridge_alerts::sound::PlayOutcome;
use inkbridge_client::realtime::events::MessageEvent;
use serde::Serialize;

use super::Coordinator;
use super::builders::{Draft, sound_category};
use crate::navigation::conversation_from_route;

/// Why an event raised no alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suppression {
    OwnMessage,
    ActiveConversation,
}

/// Which channel an event went to. Never more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sound(PlayOutcome),
    Desktop { shown: bool },
    Suppressed(Suppression),
    Ignored,
}

impl Coordinator {
    /// The conversation the user has open: the explicit pointer, else the
    /// one named by the current route.
    pub fn active_conversation(&self) -> Option<String> {
        let explicit = self
            .active_conversation
            .read()
            .ok()
            .and_then(|c| c.clone());
        explicit.or_else(|| conversation_from_route(&self.navigator.current_route()))
    }

    pub(super) fn message_suppression(&self, event: &MessageEvent) -> Option<Suppression> {
        if event.sender_id == self.user_id {
            return Some(Suppression::OwnMessage);
        }
        if self.active_conversation().as_deref() == Some(event.conversation_id.as_str()) {
            return Some(Suppression::ActiveConversation);
        }
        None
    }

    /// Visible: category sound. Hidden: OS notification that navigates to
    /// the deep link when clicked.
    pub(super) fn announce(&self, draft: Draft) -> Delivery {
        let Draft {
            notification,
            alert,
        } = draft;
        if self.visibility.is_page_visible() {
            let outcome = self
                .sound
                .play_notification_sound(sound_category(notification.kind));
            tracing::debug!(kind = notification.kind.as_str(), ?outcome, "Announced with sound");
            return Delivery::Sound(outcome);
        }

        let alert = match notification.link {
            Some(link) => {
                let navigator = self.navigator.clone();
                alert.with_on_click(move || navigator.navigate(&link))
            }
            None => alert,
        };
        let shown = self.desktop.show_notification(alert).is_some();
        tracing::debug!(kind = notification.kind.as_str(), shown, "Announced with OS notification");
        Delivery::Desktop { shown }
    }
}
