//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::hub::HubConfig;
use crate::peer::PeerConfig;

/// Port used when none is given
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Request path that is upgraded to a WebSocket
    pub path: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// The upgrade handshake must complete within this time
    pub handshake_timeout: Duration,

    /// Disconnect a peer that sends nothing for this long (None = never)
    pub idle_timeout: Option<Duration>,

    /// Accepted `Origin` header values (empty = accept any origin)
    pub allowed_origins: Vec<String>,

    /// Hub settings
    pub hub: HubConfig,

    /// Settings applied to every peer
    pub peer: PeerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            path: "/ws".to_string(),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: None,
            allowed_origins: Vec::new(),
            hub: HubConfig::default(),
            peer: PeerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the upgrade path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Accept upgrade requests from `origin`. Once any origin is added,
    /// requests from other origins are refused.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Set hub settings
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }

    /// Set peer settings
    pub fn peer(mut self, peer: PeerConfig) -> Self {
        self.peer = peer;
        self
    }

    /// Whether an upgrade request with this `Origin` may proceed
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|origin| self.allowed_origins.iter().any(|allowed| allowed == origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.path, "/ws");
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert!(config.idle_timeout.is_none());
        assert!(config.allowed_origins.is_empty());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.path, "/ws");
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .path("/chat")
            .max_connections(50)
            .handshake_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(30))
            .hub(HubConfig::default().echo(false))
            .peer(PeerConfig::default().max_body_len(255));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.path, "/chat");
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert!(!config.hub.echo);
        assert_eq!(config.peer.max_body_len, 255);
    }

    #[test]
    fn test_any_origin_by_default() {
        let config = ServerConfig::default();

        assert!(config.origin_allowed(None));
        assert!(config.origin_allowed(Some("http://evil.example")));
    }

    #[test]
    fn test_origin_allow_list() {
        let config = ServerConfig::default().allow_origin("http://127.0.0.1:8080");

        assert!(config.origin_allowed(Some("http://127.0.0.1:8080")));
        assert!(!config.origin_allowed(Some("http://evil.example")));
        assert!(!config.origin_allowed(None));
    }
}
