//! Client error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connect timeout")]
    ConnectTimeout,
}

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connect failed: {0}")]
    Connect(#[source] TransportError),

    #[error("transport read failed: {0}")]
    TransportRead(#[source] TransportError),

    #[error("transport write failed: {0}")]
    TransportWrite(#[source] TransportError),

    #[error("auth rejected by server (code {code})")]
    AuthRejected { code: i64 },

    #[error("no auth reply within {0:?}")]
    AuthTimeout(Duration),

    #[error("session is not open")]
    NotOpen,

    #[error("session already started")]
    AlreadyStarted,

    #[error("invalid session config: {0}")]
    InvalidConfig(&'static str),

    #[error("heartbeat task failed: {0}")]
    HeartbeatTask(#[source] tokio::task::JoinError),
}

impl SessionError {
    /// Returns whether opening a fresh session may succeed where this one
    /// failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Connect(_) => true,
            SessionError::TransportRead(_) => true,
            SessionError::TransportWrite(_) => true,
            SessionError::AuthTimeout(_) => true,
            _ => false,
        }
    }
}
