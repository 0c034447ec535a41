//! Error types for OpenAI Realtime sessions.

use thiserror::Error;

/// Result type for OpenAI Realtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the OpenAI Realtime API.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Generic transport failure reported by a [`Transport`](crate::Transport).
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer sent a frame that cannot be interpreted.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Session is closed.
    #[error("session closed")]
    SessionClosed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns true if this error came from the connection rather than from
    /// local encoding or configuration.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::WebSocket(_) | Error::Transport(_) | Error::SessionClosed
        )
    }
}
