//! Member entry and the views published by the hub worker

use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;

use crate::connection::Frame;
use crate::message::Message;
use crate::peer::PeerContext;

use super::event::{Outbox, PeerId};

/// Entry for a single admitted peer
#[derive(Debug)]
pub(super) struct Member {
    pub(super) outbox: Outbox,
    pub(super) context: PeerContext,
    pub(super) admitted_at: Instant,
}

/// Why a delivery to one member failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeliveryFailure {
    /// Writer task is gone, the connection is closed
    Closed,
    /// Peer stopped draining its outbox
    Full,
}

impl Member {
    pub(super) fn new(outbox: Outbox, context: PeerContext) -> Self {
        Self {
            outbox,
            context,
            admitted_at: Instant::now(),
        }
    }

    /// Queue a frame without waiting
    pub(super) fn deliver(&self, frame: Frame) -> Result<(), DeliveryFailure> {
        self.outbox.try_send(frame).map_err(|e| match e {
            TrySendError::Closed(_) => DeliveryFailure::Closed,
            TrySendError::Full(_) => DeliveryFailure::Full,
        })
    }
}

/// Read-only view of the member set, published after every applied event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Admitted peers, sorted by id
    pub members: Vec<PeerId>,
    /// Number of events the worker has applied so far
    pub applied: u64,
}

impl Roster {
    /// Number of admitted peers
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no peer is admitted
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `id` is admitted
    pub fn contains(&self, id: PeerId) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}

/// Record of one completed fan-out, sent on the delivery feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The message that was fanned out
    pub message: Message,
    /// Sending peer, `None` for system notices
    pub origin: Option<PeerId>,
    /// Members the message was queued for
    pub recipients: usize,
    /// Members removed because delivery failed
    pub evicted: Vec<PeerId>,
}
