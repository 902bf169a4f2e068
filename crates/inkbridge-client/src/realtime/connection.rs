use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as Msg;

use super::events::EVENT_JOIN;
use super::frame::{self, OpenInfo, Packet, SocketPacket};
use super::*;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Fallback liveness window when the server does not announce one.
const DEFAULT_LIVENESS: Duration = Duration::from_secs(45);

impl RealtimeClient {
    /// Run one connection from handshake to close.
    ///
    /// Errors are returned only while the connection is being established;
    /// once joined, any loss of the socket is reported as `SessionEnd::Dropped`.
    pub(super) async fn connect_once(
        config: &RealtimeConfig,
        url: &Url,
        event_tx: &mpsc::Sender<RealtimeEvent>,
        state_tx: &watch::Sender<ConnectionState>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Result<SessionEnd, ClientError> {
        tracing::info!(url = %url, "Connecting to realtime socket");
        let (mut ws, _) = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::Timeout)??;

        let open = Self::wait_for_open(&mut ws).await?;
        ws.send(Msg::Text(
            Self::namespace_connect_packet(&config.credentials.access_token).into(),
        ))
        .await?;
        Self::wait_for_namespace(&mut ws).await?;

        let join = frame::encode_event(EVENT_JOIN, &Value::String(config.credentials.user_id.clone()));
        ws.send(Msg::Text(join.into())).await?;
        state_tx.send_replace(ConnectionState::Connected);
        tracing::info!(
            sid = %open.sid,
            user_id = %config.credentials.user_id,
            "Realtime connected, personal room joined"
        );

        let liveness = Self::liveness_window(&open);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Realtime shutdown during listen");
                    let _ = ws.send(Msg::Text("41".into())).await;
                    let _ = ws.close(None).await;
                    return Ok(SessionEnd::Shutdown);
                }
                result = tokio::time::timeout(liveness, ws.next()) => {
                    match result {
                        Ok(Some(Ok(Msg::Text(text)))) => {
                            if let Some(end) = Self::handle_text(&mut ws, &text, event_tx).await {
                                return Ok(end);
                            }
                        }
                        Ok(Some(Ok(Msg::Ping(data)))) => {
                            let _ = ws.send(Msg::Pong(data)).await;
                        }
                        Ok(Some(Ok(Msg::Close(_)))) | Ok(None) => {
                            tracing::warn!("Realtime socket closed by server");
                            return Ok(SessionEnd::Dropped("server closed".into()));
                        }
                        Ok(Some(Err(e))) => return Ok(SessionEnd::Dropped(e.to_string())),
                        Ok(Some(Ok(_))) => {}
                        Err(_) => {
                            tracing::warn!("Realtime ping timeout");
                            return Ok(SessionEnd::Dropped("ping timeout".into()));
                        }
                    }
                }
            }
        }
    }

    /// Returns `Some` when the connection should end.
    async fn handle_text(
        ws: &mut WsStream,
        text: &str,
        event_tx: &mpsc::Sender<RealtimeEvent>,
    ) -> Option<SessionEnd> {
        let packet = match frame::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring undecodable realtime packet");
                return None;
            }
        };
        match packet {
            Packet::Ping(payload) => {
                tracing::trace!("Realtime ping received");
                if let Err(e) = ws.send(Msg::Text(frame::pong(&payload).into())).await {
                    return Some(SessionEnd::Dropped(e.to_string()));
                }
                None
            }
            Packet::Message(SocketPacket::Event { name, data }) => {
                match RealtimeEvent::parse(&name, &data) {
                    Ok(Some(event)) => {
                        tracing::debug!(event = event.name(), "Realtime event");
                        if event_tx.send(event).await.is_err() {
                            tracing::info!("Realtime event receiver dropped, closing");
                            return Some(SessionEnd::Shutdown);
                        }
                    }
                    Ok(None) => tracing::debug!(event = %name, "Unhandled realtime event"),
                    Err(e) => tracing::warn!(event = %name, error = %e, "Rejected malformed realtime event"),
                }
                None
            }
            Packet::Message(SocketPacket::Disconnect) => {
                Some(SessionEnd::Dropped("namespace disconnected by server".into()))
            }
            Packet::Close => Some(SessionEnd::Dropped("engine.io close".into())),
            other => {
                tracing::trace!(packet = ?other, "Realtime packet ignored");
                None
            }
        }
    }

    async fn wait_for_open(ws: &mut WsStream) -> Result<OpenInfo, ClientError> {
        loop {
            match Self::next_handshake_packet(ws).await? {
                Packet::Open(info) => {
                    tracing::debug!(sid = %info.sid, "Engine.IO open");
                    return Ok(info);
                }
                other => tracing::trace!(packet = ?other, "Packet before open ignored"),
            }
        }
    }

    async fn wait_for_namespace(ws: &mut WsStream) -> Result<(), ClientError> {
        loop {
            match Self::next_handshake_packet(ws).await? {
                Packet::Message(SocketPacket::Connect(_)) => return Ok(()),
                Packet::Message(SocketPacket::ConnectError(data)) => {
                    return Err(ClientError::Protocol(format!(
                        "namespace connect refused: {data}"
                    )));
                }
                Packet::Ping(payload) => {
                    ws.send(Msg::Text(frame::pong(&payload).into())).await?;
                }
                other => tracing::trace!(packet = ?other, "Packet before connect ignored"),
            }
        }
    }

    async fn next_handshake_packet(ws: &mut WsStream) -> Result<Packet, ClientError> {
        loop {
            match tokio::time::timeout(HANDSHAKE_TIMEOUT, ws.next()).await {
                Ok(Some(Ok(Msg::Text(text)))) => return frame::decode(&text),
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => return Err(ClientError::WebSocket(e)),
                Ok(None) => return Err(ClientError::Protocol("connection closed".into())),
                Err(_) => return Err(ClientError::Timeout),
            }
        }
    }

    /// `40` or `40{"token":"..."}` when a token is configured.
    pub(super) fn namespace_connect_packet(access_token: &str) -> String {
        if access_token.is_empty() {
            frame::CONNECT_DEFAULT_NAMESPACE.to_string()
        } else {
            format!(
                "{}{}",
                frame::CONNECT_DEFAULT_NAMESPACE,
                json!({ "token": access_token })
            )
        }
    }

    /// The server pings every `ping_interval` and expects a pong within
    /// `ping_timeout`; silence longer than both means the link is gone.
    pub(super) fn liveness_window(open: &OpenInfo) -> Duration {
        let total = open.ping_interval.saturating_add(open.ping_timeout);
        if total == 0 {
            DEFAULT_LIVENESS
        } else {
            Duration::from_millis(total)
        }
    }
}
