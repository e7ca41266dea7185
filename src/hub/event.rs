//! Events serialized through the hub intake
//!
//! Join, leave and broadcast all travel on one channel so the worker can
//! treat them uniformly as "the next thing to apply".

use tokio::sync::{mpsc, oneshot};

use crate::connection::Frame;
use crate::message::Message;
use crate::peer::PeerContext;

/// Identity assigned to a peer at admission.
///
/// Allocated by the hub worker from a counter only it touches, so ids are
/// unique for the lifetime of the hub and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(u64);

impl PeerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Outbound queue of an admitted peer.
///
/// The hub holds the only sender; the peer's writer task drains the
/// receiver into the connection.
pub type Outbox = mpsc::Sender<Frame>;

/// A peer waiting to be admitted
#[derive(Debug)]
pub struct PendingMember {
    /// Where fan-out for this peer goes
    pub outbox: Outbox,
    /// Connection details for logging
    pub context: PeerContext,
}

/// One unit of work for the hub worker
#[derive(Debug)]
pub enum HubEvent {
    /// Admit a peer and reply with its id
    Join {
        member: PendingMember,
        reply: oneshot::Sender<PeerId>,
    },
    /// Remove a peer (no-op if already gone)
    Leave { id: PeerId },
    /// Fan a message out to every member
    Broadcast {
        message: Message,
        origin: Option<PeerId>,
    },
}

impl HubEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            HubEvent::Join { .. } => "join",
            HubEvent::Leave { .. } => "leave",
            HubEvent::Broadcast { .. } => "broadcast",
        }
    }
}
