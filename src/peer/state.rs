//! Peer lifecycle state machine
//!
//! A peer only ever moves forward: pending, admitted, retired.

use std::time::Instant;

use crate::hub::PeerId;

/// Peer lifecycle phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeerPhase {
    /// Connection open, not yet admitted by the hub
    #[default]
    Pending,
    /// Present in the hub's member set
    Admitted,
    /// Removed; the connection is or will be closed
    Retired,
}

/// Lifecycle state of one peer
#[derive(Debug)]
pub struct PeerState {
    phase: PeerPhase,
    id: Option<PeerId>,
    created_at: Instant,
    admitted_at: Option<Instant>,
    retired_at: Option<Instant>,
}

impl PeerState {
    pub fn new() -> Self {
        Self {
            phase: PeerPhase::Pending,
            id: None,
            created_at: Instant::now(),
            admitted_at: None,
            retired_at: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> PeerPhase {
        self.phase
    }

    /// Id assigned at admission
    pub fn id(&self) -> Option<PeerId> {
        self.id
    }

    /// Record admission. Only valid from `Pending`; returns whether the
    /// transition happened.
    pub fn admit(&mut self, id: PeerId) -> bool {
        if self.phase != PeerPhase::Pending {
            return false;
        }
        self.phase = PeerPhase::Admitted;
        self.id = Some(id);
        self.admitted_at = Some(Instant::now());
        true
    }

    /// Record retirement. A pending peer may retire directly (admission
    /// failed); retiring twice returns `false`.
    pub fn retire(&mut self) -> bool {
        if self.phase == PeerPhase::Retired {
            return false;
        }
        self.phase = PeerPhase::Retired;
        self.retired_at = Some(Instant::now());
        true
    }

    /// Time since the peer was created
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Time spent admitted, if the peer was ever admitted
    pub fn membership(&self) -> Option<std::time::Duration> {
        let admitted = self.admitted_at?;
        Some(match self.retired_at {
            Some(retired) => retired.duration_since(admitted),
            None => admitted.elapsed(),
        })
    }
}

impl Default for PeerState {
    fn default() -> Self {
        Self::new()
    }
}
