//! Connection details carried alongside a peer

use std::net::SocketAddr;
use std::time::Instant;

/// Read-only information about the connection behind a peer
#[derive(Debug, Clone)]
pub struct PeerContext {
    /// Remote address, `None` for in-process peers
    pub peer_addr: Option<SocketAddr>,

    /// Request path the connection was upgraded on
    pub path: Option<String>,

    /// `Origin` header sent with the upgrade request
    pub origin: Option<String>,

    /// When the transport handed the connection over
    pub connected_at: Instant,
}

impl PeerContext {
    /// Context for a remote connection
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr: Some(peer_addr),
            path: None,
            origin: None,
            connected_at: Instant::now(),
        }
    }

    /// Context for an in-process peer
    pub fn local() -> Self {
        Self {
            peer_addr: None,
            path: None,
            origin: None,
            connected_at: Instant::now(),
        }
    }

    /// Attach upgrade request details
    pub fn with_request(mut self, path: impl Into<String>, origin: Option<String>) -> Self {
        self.path = Some(path.into());
        self.origin = origin;
        self
    }
}
