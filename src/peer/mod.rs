//! Peers: one connection bridged into the hub
//!
//! A peer binds a [`Connection`](crate::connection::Connection) to a hub it
//! does not own. It only talks to the hub through join, leave and broadcast
//! events, so the member set stays single-writer.

pub mod config;
pub mod context;
pub mod runner;
pub mod state;

pub use config::PeerConfig;
pub use context::PeerContext;
pub use runner::Peer;
pub use state::{PeerPhase, PeerState};
