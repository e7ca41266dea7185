//! Error types
//!
//! Peer-local failures (read/write errors, handshake problems) end a single
//! connection. They are never reported to the hub as faults; the hub only
//! ever sees the resulting leave event.

use thiserror::Error;

use crate::hub::HubError;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by connections, peers and the server
#[derive(Debug, Error)]
pub enum Error {
    /// Socket level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Message could not be serialized or parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The hub could not accept an event
    #[error("hub error: {0}")]
    Hub(#[from] HubError),

    /// Handshake did not complete within the configured time
    #[error("handshake timed out")]
    HandshakeTimeout,

    /// No frame arrived within the configured idle timeout
    #[error("connection idle for too long")]
    IdleTimeout,

    /// The other side of an in-process connection went away
    #[error("connection closed")]
    ConnectionClosed,
}
