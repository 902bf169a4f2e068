use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as Msg;

use super::events::*;
use super::frame::{self, Packet, SocketPacket};
use super::*;

fn config(url: &str) -> RealtimeConfig {
    RealtimeConfig::new(url, Credentials::new("user-1", "tok"))
}

#[test]
fn websocket_url_from_https_origin() {
    let url = config("https://api.example.com").websocket_url().unwrap();
    assert_eq!(
        url.as_str(),
        "wss://api.example.com/socket.io/?EIO=4&transport=websocket"
    );
}

#[test]
fn websocket_url_keeps_custom_path() {
    let url = config("http://localhost:5000/realtime/")
        .websocket_url()
        .unwrap();
    assert_eq!(
        url.as_str(),
        "ws://localhost:5000/realtime/?EIO=4&transport=websocket"
    );
}

#[test]
fn websocket_url_rejects_other_schemes() {
    assert!(config("ftp://example.com").websocket_url().is_err());
}

#[tokio::test]
async fn connect_requires_user_id() {
    let cfg = RealtimeConfig::new("https://api.example.com", Credentials::new(" ", "tok"));
    assert!(matches!(
        RealtimeClient::connect(cfg).await,
        Err(ClientError::AuthRequired)
    ));
}

#[test]
fn retries_are_bounded() {
    assert!(!RealtimeClient::retries_exhausted(1, 5));
    assert!(!RealtimeClient::retries_exhausted(5, 5));
    assert!(RealtimeClient::retries_exhausted(6, 5));
    assert!(RealtimeClient::retries_exhausted(1, 0));
}

#[test]
fn namespace_connect_carries_token() {
    assert_eq!(RealtimeClient::namespace_connect_packet(""), "40");
    assert_eq!(
        RealtimeClient::namespace_connect_packet("abc"),
        r#"40{"token":"abc"}"#
    );
}

#[test]
fn liveness_window_uses_announced_timers() {
    let open = frame::OpenInfo {
        sid: "s".into(),
        ping_interval: 25_000,
        ping_timeout: 20_000,
    };
    assert_eq!(
        RealtimeClient::liveness_window(&open),
        Duration::from_millis(45_000)
    );
}

#[test]
fn liveness_window_saturates_on_huge_timers() {
    let open = frame::OpenInfo {
        sid: "s".into(),
        ping_interval: u64::MAX,
        ping_timeout: 20_000,
    };
    assert_eq!(
        RealtimeClient::liveness_window(&open),
        Duration::from_millis(u64::MAX)
    );
}

#[test]
fn decode_open_packet() {
    let packet =
        frame::decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
            .unwrap();
    match packet {
        Packet::Open(info) => {
            assert_eq!(info.sid, "abc");
            assert_eq!(info.ping_interval, 25_000);
        }
        other => panic!("unexpected packet {other:?}"),
    }
}

#[test]
fn decode_event_with_namespace_and_ack() {
    let packet = frame::decode(r#"42/chat,17["newMessage",{"content":"hi"}]"#).unwrap();
    assert_eq!(
        packet,
        Packet::Message(SocketPacket::Event {
            name: "newMessage".into(),
            data: json!({ "content": "hi" }),
        })
    );
}

#[test]
fn decode_control_packets() {
    assert_eq!(frame::decode("2").unwrap(), Packet::Ping(String::new()));
    assert_eq!(frame::decode("1").unwrap(), Packet::Close);
    assert_eq!(
        frame::decode("40").unwrap(),
        Packet::Message(SocketPacket::Connect(None))
    );
    assert_eq!(
        frame::decode("41").unwrap(),
        Packet::Message(SocketPacket::Disconnect)
    );
    assert!(frame::decode("").is_err());
    assert!(frame::decode("9").is_err());
    assert!(frame::decode(r#"42[1,2]"#).is_err());
}

#[test]
fn encode_join_event() {
    assert_eq!(
        frame::encode_event(EVENT_JOIN, &json!("user-1")),
        r#"42["join","user-1"]"#
    );
    assert_eq!(frame::pong("hb"), "3hb");
}

#[test]
fn parse_new_agreement_flat_and_nested() {
    let flat = json!({ "agreementId": "a1", "projectTitle": "Essay", "studentName": "Ann" });
    let nested = json!({ "agreement": { "_id": "a1", "title": "Essay", "student": { "name": "Ann" } } });
    for payload in [flat, nested] {
        let event = RealtimeEvent::parse(EVENT_NEW_AGREEMENT, &payload)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            RealtimeEvent::NewAgreement(AgreementEvent {
                agreement_id: "a1".into(),
                title: "Essay".into(),
                counterpart: "Ann".into(),
                status: String::new(),
            })
        );
    }
}

#[test]
fn parse_agreement_without_id_is_rejected() {
    let err = RealtimeEvent::parse(EVENT_AGREEMENT_UPDATED, &json!({ "title": "x" }));
    assert!(matches!(err, Err(ClientError::Protocol(_))));
}

#[test]
fn parse_payment_amount_from_string() {
    let event = RealtimeEvent::parse(
        EVENT_PAYMENT_COMPLETED,
        &json!({ "agreementId": 42, "amount": "150.5", "currency": "usd" }),
    )
    .unwrap()
    .unwrap();
    match event {
        RealtimeEvent::PaymentCompleted(p) => {
            assert_eq!(p.agreement_id, "42");
            assert_eq!(p.amount, Some(150.5));
            assert_eq!(p.currency, "USD");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn parse_message_with_sender_object_and_attachment() {
    let payload = json!({
        "message": {
            "_id": "m1",
            "chatId": "c9",
            "sender": { "_id": "u2", "name": "Bob" },
            "fileUrl": "https://cdn/x.pdf",
            "fileName": "x.pdf"
        }
    });
    let event = RealtimeEvent::parse(EVENT_NEW_MESSAGE, &payload)
        .unwrap()
        .unwrap();
    match event {
        RealtimeEvent::NewMessage(m) => {
            assert_eq!(m.message_id, "m1");
            assert_eq!(m.conversation_id, "c9");
            assert_eq!(m.sender_id, "u2");
            assert_eq!(m.sender_name, "Bob");
            assert_eq!(
                m.attachment,
                Some(Attachment {
                    file_name: "x.pdf".into()
                })
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn parse_message_requires_conversation_and_sender() {
    let err = RealtimeEvent::parse(EVENT_MESSAGE_BROADCAST, &json!({ "content": "hi" }));
    assert!(err.is_err());
}

#[test]
fn unknown_event_names_are_ignored() {
    assert_eq!(RealtimeEvent::parse("typing", &json!({})).unwrap(), None);
    assert!(matches!(
        RealtimeEvent::parse(EVENT_DASHBOARD_UPDATE, &json!({ "k": 1 })).unwrap(),
        Some(RealtimeEvent::DashboardUpdate(_))
    ));
}

// ---- live socket ----

const OPEN_PACKET: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
const WAIT: Duration = Duration::from_secs(5);

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> Option<String> {
    while let Some(Ok(msg)) = ws.next().await {
        if let Msg::Text(text) = msg {
            return Some(text.as_str().to_string());
        }
    }
    None
}

/// Minimal Socket.IO server: handshake, record the join, then hang up on
/// the first connection and keep every later one open.
async fn serve_dropping_first(listener: TcpListener, joins: mpsc::UnboundedSender<String>) {
    let mut accepted = 0;
    while let Ok((stream, _)) = listener.accept().await {
        accepted += 1;
        let hang_up = accepted == 1;
        let joins = joins.clone();
        tokio::spawn(async move {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            ws.send(Msg::Text(OPEN_PACKET.into())).await.unwrap();
            let connect = next_text(&mut ws).await.unwrap();
            assert_eq!(connect, r#"40{"token":"tok"}"#);
            ws.send(Msg::Text(r#"40{"sid":"n1"}"#.into())).await.unwrap();
            if let Some(join) = next_text(&mut ws).await {
                let _ = joins.send(join);
            }
            if hang_up {
                let _ = ws.close(None).await;
                return;
            }
            while next_text(&mut ws).await.is_some() {}
        });
    }
}

#[tokio::test]
async fn rejoins_room_after_connection_drops() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (joins_tx, mut joins) = mpsc::unbounded_channel();
    let server = tokio::spawn(serve_dropping_first(listener, joins_tx));

    let mut cfg = config(&format!("http://{addr}"));
    cfg.reconnect_delay = Duration::from_millis(50);
    let mut session = RealtimeClient::connect(cfg).await.unwrap();

    for _ in 0..2 {
        let join = tokio::time::timeout(WAIT, joins.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(join, r#"42["join","user-1"]"#);
    }
    tokio::time::timeout(WAIT, session.state.wait_for(|s| s.is_connected()))
        .await
        .unwrap()
        .unwrap();

    session.shutdown.send(()).await.unwrap();
    tokio::time::timeout(
        WAIT,
        session
            .state
            .wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();
    server.abort();
}

#[tokio::test]
async fn settles_disconnected_once_retries_run_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let server = {
        let accepted = accepted.clone();
        tokio::spawn(async move {
            // Accept the TCP connection, then hang up before the upgrade.
            while let Ok((stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        })
    };

    let mut cfg = config(&format!("http://{addr}"));
    cfg.max_reconnect_attempts = 2;
    cfg.reconnect_delay = Duration::from_millis(20);
    let mut session = RealtimeClient::connect(cfg).await.unwrap();

    tokio::time::timeout(
        WAIT,
        session
            .state
            .wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();

    // The initial attempt plus two reconnects.
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
    assert!(session.events.recv().await.is_none());
    server.abort();
}
