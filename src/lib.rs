//! Real-time fan-out hub for WebSocket connections
//!
//! Every message a connected peer sends is broadcast to the peers currently
//! connected. A single worker task owns the member set; peers talk to it
//! only through join, leave and broadcast events.
//!
//! ```no_run
//! use chat_hub::{DefaultHandler, HubServer, ServerConfig};
//!
//! # async fn run() -> chat_hub::Result<()> {
//! let config = ServerConfig::with_addr("127.0.0.1:8080".parse().unwrap());
//! let server = HubServer::new(config, DefaultHandler);
//! server.run().await
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod hub;
pub mod message;
pub mod peer;
pub mod server;
pub mod stats;

pub use connection::{Connection, Frame, FrameReader, FrameWriter};
pub use error::{Error, Result};
pub use hub::{Delivery, Hub, HubConfig, HubError, PeerId, Roster, WeakHub};
pub use message::Message;
pub use peer::{Peer, PeerConfig, PeerContext};
pub use server::{DefaultHandler, HubHandler, HubServer, ServerConfig};
pub use stats::{HubStats, HubStatsSnapshot, PeerStats};
