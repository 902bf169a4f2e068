//! Strict inbound event types.
//!
//! Raw Socket.IO payloads are normalized here, once, before any
//! coordinator logic runs. Payloads missing the fields an event needs
//! are rejected with [`ClientError::Protocol`].

use serde::Serialize;
use serde_json::Value;

use crate::ClientError;

pub const EVENT_NEW_AGREEMENT: &str = "newAgreement";
pub const EVENT_AGREEMENT_ACCEPTED: &str = "agreementAccepted";
pub const EVENT_AGREEMENT_UPDATED: &str = "agreementUpdated";
pub const EVENT_PAYMENT_COMPLETED: &str = "paymentCompleted";
pub const EVENT_NEW_MESSAGE: &str = "newMessage";
pub const EVENT_MESSAGE_BROADCAST: &str = "messageBroadcast";
pub const EVENT_DASHBOARD_UPDATE: &str = "dashboardUpdate";

/// Client → server event joining the personal room.
pub const EVENT_JOIN: &str = "join";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementEvent {
    pub agreement_id: String,
    pub title: String,
    /// Display name of the other party (student or writer), if sent.
    pub counterpart: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentEvent {
    pub agreement_id: String,
    pub payment_id: String,
    pub amount: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEvent {
    pub message_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub attachment: Option<Attachment>,
}

/// A recognized server → client event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RealtimeEvent {
    NewAgreement(AgreementEvent),
    AgreementAccepted(AgreementEvent),
    AgreementUpdated(AgreementEvent),
    PaymentCompleted(PaymentEvent),
    NewMessage(MessageEvent),
    MessageBroadcast(MessageEvent),
    DashboardUpdate(Value),
}

impl RealtimeEvent {
    /// Normalize a named payload. Unknown event names yield `Ok(None)`.
    pub fn parse(name: &str, data: &Value) -> Result<Option<Self>, ClientError> {
        let event = match name {
            EVENT_NEW_AGREEMENT => Self::NewAgreement(parse_agreement(name, data)?),
            EVENT_AGREEMENT_ACCEPTED => Self::AgreementAccepted(parse_agreement(name, data)?),
            EVENT_AGREEMENT_UPDATED => Self::AgreementUpdated(parse_agreement(name, data)?),
            EVENT_PAYMENT_COMPLETED => Self::PaymentCompleted(parse_payment(data)?),
            EVENT_NEW_MESSAGE => Self::NewMessage(parse_message(name, data)?),
            EVENT_MESSAGE_BROADCAST => Self::MessageBroadcast(parse_message(name, data)?),
            EVENT_DASHBOARD_UPDATE => Self::DashboardUpdate(data.clone()),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::NewAgreement(_) => EVENT_NEW_AGREEMENT,
            Self::AgreementAccepted(_) => EVENT_AGREEMENT_ACCEPTED,
            Self::AgreementUpdated(_) => EVENT_AGREEMENT_UPDATED,
            Self::PaymentCompleted(_) => EVENT_PAYMENT_COMPLETED,
            Self::NewMessage(_) => EVENT_NEW_MESSAGE,
            Self::MessageBroadcast(_) => EVENT_MESSAGE_BROADCAST,
            Self::DashboardUpdate(_) => EVENT_DASHBOARD_UPDATE,
        }
    }
}

fn parse_agreement(name: &str, data: &Value) -> Result<AgreementEvent, ClientError> {
    let root = nested(data, "agreement");
    let agreement_id = first_field(
        &[root, data],
        &[&["agreementId"], &["_id"], &["id"]],
    );
    if agreement_id.is_empty() {
        return Err(ClientError::Protocol(format!("{name} without agreement id")));
    }
    Ok(AgreementEvent {
        agreement_id,
        title: first_field(&[root, data], &[&["projectTitle"], &["title"], &["subject"]]),
        counterpart: first_field(
            &[root, data],
            &[
                &["studentName"],
                &["writerName"],
                &["student", "name"],
                &["writer", "name"],
            ],
        ),
        status: first_field(&[root, data], &[&["status"]]),
    })
}

fn parse_payment(data: &Value) -> Result<PaymentEvent, ClientError> {
    let root = nested(data, "payment");
    let agreement_id = first_field(&[root, data], &[&["agreementId"], &["agreement", "_id"]]);
    let payment_id = first_field(&[root, data], &[&["paymentId"], &["_id"], &["id"]]);
    if agreement_id.is_empty() && payment_id.is_empty() {
        return Err(ClientError::Protocol(
            "paymentCompleted without agreement or payment id".into(),
        ));
    }
    let amount = [root, data]
        .iter()
        .find_map(|v| v.get("amount"))
        .and_then(|a| match a {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
    Ok(PaymentEvent {
        agreement_id,
        payment_id,
        amount,
        currency: first_field(&[root, data], &[&["currency"]]).to_uppercase(),
    })
}

fn parse_message(name: &str, data: &Value) -> Result<MessageEvent, ClientError> {
    let root = nested(data, "message");
    let sources = [root, data];
    let conversation_id = first_field(
        &sources,
        &[&["conversationId"], &["chatId"], &["conversation", "_id"], &["chat", "_id"]],
    );
    let sender_id = first_field(
        &sources,
        &[&["senderId"], &["sender", "_id"], &["sender", "id"], &["sender"]],
    );
    if conversation_id.is_empty() || sender_id.is_empty() {
        return Err(ClientError::Protocol(format!(
            "{name} without conversation or sender id"
        )));
    }

    let file_name = first_field(&sources, &[&["fileName"], &["attachment", "name"], &["file", "name"]]);
    let has_file = !file_name.is_empty()
        || !first_field(&sources, &[&["fileUrl"], &["attachment", "url"], &["file", "url"]]).is_empty()
        || first_field(&sources, &[&["type"]]).eq_ignore_ascii_case("file");

    Ok(MessageEvent {
        message_id: first_field(&sources, &[&["messageId"], &["_id"], &["id"]]),
        conversation_id,
        sender_id,
        sender_name: first_field(&sources, &[&["senderName"], &["sender", "name"]]),
        content: first_field(&sources, &[&["content"], &["text"], &["message"]]),
        attachment: has_file.then_some(Attachment { file_name }),
    })
}

/// `data[key]` when it is an object, otherwise `data` itself.
fn nested<'a>(data: &'a Value, key: &str) -> &'a Value {
    data.get(key).filter(|v| v.is_object()).unwrap_or(data)
}

/// First non-empty string (or number) found across sources and paths.
fn first_field(sources: &[&Value], paths: &[&[&str]]) -> String {
    sources
        .iter()
        .flat_map(|source| paths.iter().map(move |path| str_field(source, path)))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn str_field(value: &Value, path: &[&str]) -> String {
    let mut cur = value;
    for key in path {
        cur = match cur.get(*key) {
            Some(v) => v,
            None => return String::new(),
        };
    }
    match cur {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
