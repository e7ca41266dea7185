//! Statistics for the hub and its peers

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::hub::PeerId;
use crate::peer::PeerPhase;

/// Hub-wide counters.
///
/// Written only by the hub worker; any handle may read a snapshot.
#[derive(Debug, Default)]
pub struct HubStats {
    joins: AtomicU64,
    leaves: AtomicU64,
    evictions: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    active_members: AtomicU64,
}

impl HubStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_join(&self, members: usize) {
        self.joins.fetch_add(1, Ordering::Relaxed);
        self.active_members.store(members as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_leave(&self, members: usize) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
        self.active_members.store(members as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self, members: usize) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.active_members.store(members as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fan_out(&self, delivered: usize, failed: usize) {
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Read the current values
    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            active_members: self.active_members.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`HubStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStatsSnapshot {
    /// Peers admitted
    pub joins: u64,
    /// Peers removed by a leave event
    pub leaves: u64,
    /// Peers removed because delivery to them failed
    pub evictions: u64,
    /// Broadcast events applied (system notices excluded)
    pub broadcasts: u64,
    /// Frames queued to member outboxes, notices included
    pub deliveries: u64,
    /// Frames that could not be queued
    pub delivery_failures: u64,
    /// Currently admitted peers
    pub active_members: u64,
}

/// Per-peer counters, returned when the peer retires
#[derive(Debug, Clone, Default)]
pub struct PeerStats {
    /// Id the hub assigned, `None` if the peer was never admitted
    pub peer_id: Option<PeerId>,
    /// Lifecycle phase the peer ended in
    pub phase: PeerPhase,
    /// Time spent as a hub member
    pub membership: Option<Duration>,
    /// Frames read from the connection
    pub frames_received: u64,
    /// Messages handed to the hub as broadcasts
    pub messages_forwarded: u64,
    /// Frames dropped as malformed
    pub frames_dropped: u64,
    /// Time from start to retirement
    pub duration: Duration,
}

impl PeerStats {
    pub fn new() -> Self {
        Self::default()
    }
}
