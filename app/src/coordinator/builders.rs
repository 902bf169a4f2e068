//! Notification records and OS alerts built from realtime events.

use chrono::Utc;
use inkbridge_alerts::desktop::{ChatBody, chat_message_notification};
use inkbridge_alerts::{DesktopRequest, SoundCategory};
use inkbridge_client::api::{Notification, NotificationKind};
use inkbridge_client::realtime::events::{AgreementEvent, MessageEvent, PaymentEvent};

/// A notification plus the OS alert announcing it.
pub(crate) struct Draft {
    pub notification: Notification,
    pub alert: DesktopRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AgreementChange {
    Created,
    Accepted,
    Updated,
}

pub(crate) fn agreement(change: AgreementChange, event: &AgreementEvent) -> Draft {
    let project = display_or(&event.title, "your project");
    let counterpart = event.counterpart.as_str();
    let (title, body) = match change {
        AgreementChange::Created => (
            "New Agreement",
            if counterpart.is_empty() {
                format!("New agreement for \"{project}\"")
            } else {
                format!("{counterpart} sent an agreement for \"{project}\"")
            },
        ),
        AgreementChange::Accepted => (
            "Agreement Accepted",
            if counterpart.is_empty() {
                format!("The agreement for \"{project}\" was accepted")
            } else {
                format!("{counterpart} accepted the agreement for \"{project}\"")
            },
        ),
        AgreementChange::Updated => (
            "Agreement Updated",
            if event.status.is_empty() {
                format!("The agreement for \"{project}\" was updated")
            } else {
                format!("The agreement for \"{project}\" is now {}", event.status)
            },
        ),
    };
    build(
        NotificationKind::Agreement,
        title,
        body,
        format!("/agreements/{}", event.agreement_id),
        format!("agreement-{}", event.agreement_id),
    )
}

pub(crate) fn payment(event: &PaymentEvent) -> Draft {
    let body = match event.amount {
        Some(amount) if event.currency.is_empty() => format!("Payment of {amount:.2} completed"),
        Some(amount) => format!("Payment of {amount:.2} {} completed", event.currency),
        None => "A payment was completed".to_string(),
    };
    let (link, key) = if event.agreement_id.is_empty() {
        (format!("/payments/{}", event.payment_id), &event.payment_id)
    } else {
        (format!("/agreements/{}", event.agreement_id), &event.agreement_id)
    };
    let tag = format!("payment-{key}");
    build(NotificationKind::Payment, "Payment Completed", body, link, tag)
}

/// Message text and OS alert share the chat preview formatting.
pub(crate) fn message(event: &MessageEvent) -> Draft {
    let body = match &event.attachment {
        Some(file) if event.content.is_empty() => ChatBody::Attachment {
            file_name: Some(file.file_name.as_str()),
        },
        _ => ChatBody::Text(&event.content),
    };
    let alert = chat_message_notification(&event.sender_name, body, &event.conversation_id);
    let notification = Notification {
        id: new_id(),
        kind: NotificationKind::Message,
        title: alert.content.title.clone(),
        message: alert.content.body.clone(),
        link: Some(chat_link(&event.conversation_id)),
        read: false,
        created_at: Utc::now(),
    };
    Draft {
        notification,
        alert,
    }
}

pub(crate) fn chat_link(conversation_id: &str) -> String {
    format!("/chat/{conversation_id}")
}

pub(crate) fn sound_category(kind: NotificationKind) -> SoundCategory {
    match kind {
        NotificationKind::Message => SoundCategory::Message,
        NotificationKind::Agreement => SoundCategory::Agreement,
        NotificationKind::Payment => SoundCategory::Payment,
        NotificationKind::Other => SoundCategory::Other,
    }
}

fn build(
    kind: NotificationKind,
    title: &str,
    body: String,
    link: String,
    tag: String,
) -> Draft {
    let alert = DesktopRequest::new(title, body.clone(), tag);
    Draft {
        notification: Notification {
            id: new_id(),
            kind,
            title: title.to_string(),
            message: body,
            link: Some(link),
            read: false,
            created_at: Utc::now(),
        },
        alert,
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
