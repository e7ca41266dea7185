//! Connection registry and broadcast coordinator
//!
//! The hub owns the set of admitted peers and is the only writer to their
//! outbound queues. Peers never touch that set; they send events through a
//! single intake and one worker applies those events strictly in order.
//!
//! # Architecture
//!
//! ```text
//!    [Peer]  read loop          [Peer]  read loop          [Peer]  read loop
//!       │ join/leave/broadcast     │                          │
//!       └──────────────────────────┼──────────────────────────┘
//!                                  ▼
//!                       mpsc intake (bounded, FIFO)
//!                                  │
//!                                  ▼
//!                     ┌─────────────────────────┐
//!                     │ HubWorker               │
//!                     │   members: HashMap<     │
//!                     │     PeerId, Member {    │
//!                     │       outbox: Sender,   │
//!                     │     }                   │
//!                     │   >                     │
//!                     └───────────┬─────────────┘
//!              try_send (never    │  awaits I/O)
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!     outbox ──► writer       outbox ──► writer       outbox ──► writer
//!                task ──► WS             task ──► WS             task ──► WS
//! ```
//!
//! # Delivery failures
//!
//! A member whose outbox is closed (connection gone) or full (peer stopped
//! reading) is removed after the current fan-out pass. The rest of the
//! members still get the message, and the survivors get a
//! "peer disconnected" notice for each removed member.

pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod member;
pub mod worker;

pub use config::HubConfig;
pub use error::HubError;
pub use event::{HubEvent, Outbox, PeerId, PendingMember};
pub use handle::{Hub, WeakHub};
pub use member::{Delivery, Roster};
pub use worker::HubWorker;
