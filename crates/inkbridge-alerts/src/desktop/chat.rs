use super::DesktopRequest;

/// Maximum characters of message text shown in a notification body.
pub const CHAT_PREVIEW_LENGTH: usize = 100;

/// Body of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatBody<'a> {
    Text(&'a str),
    Attachment { file_name: Option<&'a str> },
}

/// Format a chat message as an OS notification tagged per conversation,
/// so a burst of messages in one chat collapses into a single entry.
pub fn chat_message_notification(
    sender_name: &str,
    body: ChatBody<'_>,
    conversation_id: &str,
) -> DesktopRequest {
    let sender = match sender_name.trim() {
        "" => "Someone",
        name => name,
    };
    let text = match body {
        ChatBody::Text(text) if text.trim().is_empty() => "Sent a message".to_string(),
        ChatBody::Text(text) => truncate_preview(text.trim(), CHAT_PREVIEW_LENGTH),
        ChatBody::Attachment {
            file_name: Some(name),
        } if !name.trim().is_empty() => format!("📎 Sent an attachment: {}", name.trim()),
        ChatBody::Attachment { .. } => "📎 Sent an attachment".to_string(),
    };
    DesktopRequest::new(
        format!("New message from {sender}"),
        text,
        format!("message-{conversation_id}"),
    )
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
