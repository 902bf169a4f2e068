//! Socket.IO real-time client for marketplace events.
//!
//! Connects over a websocket, joins the user's personal room, and
//! re-joins every time the connection is (re-)established. Dropped
//! connections are retried with a fixed delay up to a bounded number
//! of attempts, after which the client settles in `Disconnected`.

mod connection;
pub mod events;
pub mod frame;
#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::{ClientError, Credentials};

pub use events::RealtimeEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Live connection status as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Real-time client configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Server origin, e.g. `https://api.example.com`.
    pub server_url: String,
    pub credentials: Credentials,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl RealtimeConfig {
    pub fn new(server_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            server_url: server_url.into(),
            credentials,
            max_reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    /// Websocket endpoint: `ws(s)://host/socket.io/?EIO=4&transport=websocket`.
    pub fn websocket_url(&self) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.server_url)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(ClientError::Protocol(format!(
                    "unsupported socket scheme '{other}'"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Protocol("cannot set websocket scheme".into()))?;
        if url.path().is_empty() || url.path() == "/" {
            url.set_path("/socket.io/");
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("EIO", "4")
            .append_pair("transport", "websocket");
        Ok(url)
    }
}

/// Handles returned by [`RealtimeClient::connect`].
pub struct RealtimeSession {
    pub events: mpsc::Receiver<RealtimeEvent>,
    pub state: watch::Receiver<ConnectionState>,
    pub shutdown: mpsc::Sender<()>,
}

/// How a single established connection ended.
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    Dropped(String),
}

/// Socket.IO client with bounded auto-reconnect.
///
/// Events are delivered via `mpsc::Receiver<RealtimeEvent>` in the
/// order the transport delivers them.
pub struct RealtimeClient;

impl RealtimeClient {
    /// Start the connection loop. Returns the event stream, the connection
    /// state and a shutdown sender.
    pub async fn connect(config: RealtimeConfig) -> Result<RealtimeSession, ClientError> {
        if !config.credentials.is_complete() {
            return Err(ClientError::AuthRequired);
        }
        let url = config.websocket_url()?;

        let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(Self::run_loop(config, url, event_tx, state_tx, shutdown_rx));
        Ok(RealtimeSession {
            events: event_rx,
            state: state_rx,
            shutdown: shutdown_tx,
        })
    }

    async fn run_loop(
        config: RealtimeConfig,
        url: Url,
        event_tx: mpsc::Sender<RealtimeEvent>,
        state_tx: watch::Sender<ConnectionState>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut attempt: u32 = 0;
        loop {
            if shutdown_rx.try_recv().is_ok() {
                tracing::info!("Realtime shutdown requested");
                break;
            }
            state_tx.send_replace(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            });

            match Self::connect_once(&config, &url, &event_tx, &state_tx, &mut shutdown_rx).await {
                Ok(SessionEnd::Shutdown) => {
                    tracing::info!("Realtime connection closed cleanly");
                    break;
                }
                Ok(SessionEnd::Dropped(reason)) => {
                    attempt = 1;
                    tracing::warn!(reason, "Realtime connection dropped, will reconnect");
                }
                Err(e) => {
                    attempt += 1;
                    if Self::retries_exhausted(attempt, config.max_reconnect_attempts) {
                        tracing::error!(
                            error = %e,
                            attempts = attempt - 1,
                            "Realtime connection failed, giving up"
                        );
                        break;
                    }
                    tracing::warn!(
                        error = %e, attempt,
                        delay_ms = config.reconnect_delay.as_millis() as u64,
                        "Realtime connection failed, will reconnect"
                    );
                }
            }

            state_tx.send_replace(ConnectionState::Reconnecting { attempt });
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Realtime shutdown requested during reconnect delay");
                    break;
                }
                _ = tokio::time::sleep(config.reconnect_delay) => {}
            }
        }
        state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// `attempt` counts the reconnect about to be made; the initial
    /// connection is attempt zero.
    fn retries_exhausted(attempt: u32, max_attempts: u32) -> bool {
        attempt > max_attempts
    }
}
