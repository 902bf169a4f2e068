//! Inkbridge marketplace client library.
//!
//! Provides the notification REST client and the Socket.IO
//! real-time client used by the notification coordinator.

pub mod api;
pub mod realtime;

use serde::{Deserialize, Serialize};

/// Identity of the signed-in user.
///
/// The caller is responsible for obtaining and persisting this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// A session needs a user id before it can join its personal room.
    pub fn is_complete(&self) -> bool {
        !self.user_id.trim().is_empty()
    }
}

/// Unified error type for the inkbridge-client crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication required: no user id")]
    AuthRequired,

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}
