//! Engine.IO v4 / Socket.IO v4 text packet codec.
//!
//! Only the subset a websocket-only client needs: open, close, ping/pong,
//! namespace connect/disconnect and events on the default namespace.

use serde::Deserialize;
use serde_json::Value;

use crate::ClientError;

/// Engine.IO handshake payload (`0{...}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(Value),
    /// Acks and binary packets; this client never requests them.
    Other(char),
}

/// Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

pub const CONNECT_DEFAULT_NAMESPACE: &str = "40";

pub fn pong(payload: &str) -> String {
    format!("3{payload}")
}

/// Encode an event on the default namespace: `42["name",data]`.
pub fn encode_event(name: &str, data: &Value) -> String {
    let body = Value::Array(vec![Value::String(name.to_string()), data.clone()]);
    format!("42{body}")
}

pub fn decode(text: &str) -> Result<Packet, ClientError> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ClientError::Protocol("empty packet".into()))?;
    let rest = chars.as_str();
    match kind {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping(rest.to_string())),
        '3' => Ok(Packet::Pong(rest.to_string())),
        '4' => Ok(Packet::Message(decode_socket_packet(rest)?)),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(ClientError::Protocol(format!(
            "unknown engine.io packet type '{other}'"
        ))),
    }
}

fn decode_socket_packet(text: &str) -> Result<SocketPacket, ClientError> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| ClientError::Protocol("empty socket.io packet".into()))?;
    let body = strip_namespace_and_ack(chars.as_str());
    match kind {
        '0' => {
            if body.is_empty() {
                Ok(SocketPacket::Connect(None))
            } else {
                Ok(SocketPacket::Connect(Some(serde_json::from_str(body)?)))
            }
        }
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let items: Vec<Value> = serde_json::from_str(body)?;
            let mut items = items.into_iter();
            let name = match items.next() {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(ClientError::Protocol(
                        "socket.io event without a name".into(),
                    ));
                }
            };
            let data = items.next().unwrap_or(Value::Null);
            Ok(SocketPacket::Event { name, data })
        }
        '4' => {
            let data = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(body)?
            };
            Ok(SocketPacket::ConnectError(data))
        }
        other => Ok(SocketPacket::Other(other)),
    }
}

/// Drop a leading `/namespace,` and a numeric ack id.
fn strip_namespace_and_ack(text: &str) -> &str {
    let text = if text.starts_with('/') {
        text.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        text
    };
    text.trim_start_matches(|c: char| c.is_ascii_digit())
}
