//! WebSocket server in front of a hub
//!
//! Accepts TCP connections, upgrades requests on the configured path and
//! runs one [`Peer`](crate::peer::Peer) per connection.

pub mod config;
pub mod handler;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use handler::{DefaultHandler, HubHandler};
pub use listener::HubServer;
