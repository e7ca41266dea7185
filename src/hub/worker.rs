//! The hub worker
//!
//! A single task that owns the member set and applies events one at a time.
//! Nothing else can reach the map, so membership changes and fan-out never
//! interleave and no lock is needed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::message::{Message, PEER_DISCONNECTED, PEER_JOINED};
use crate::stats::HubStats;

use super::config::HubConfig;
use super::event::{HubEvent, PeerId, PendingMember};
use super::member::{Delivery, DeliveryFailure, Member, Roster};

/// Fan-out waiting to be performed by the current event
struct FanOut {
    message: Message,
    origin: Option<PeerId>,
    skip: Option<PeerId>,
}

/// Serial consumer of the hub intake
pub struct HubWorker {
    intake: mpsc::Receiver<HubEvent>,
    members: HashMap<PeerId, Member>,
    next_id: u64,
    config: HubConfig,
    roster: watch::Sender<Roster>,
    deliveries: broadcast::Sender<Delivery>,
    stats: Arc<HubStats>,
    roster_dirty: bool,
}

impl HubWorker {
    pub(super) fn new(
        intake: mpsc::Receiver<HubEvent>,
        config: HubConfig,
        roster: watch::Sender<Roster>,
        deliveries: broadcast::Sender<Delivery>,
        stats: Arc<HubStats>,
    ) -> Self {
        Self {
            intake,
            members: HashMap::new(),
            next_id: 1,
            config,
            roster,
            deliveries,
            stats,
            roster_dirty: false,
        }
    }

    /// Apply events until every strong hub handle is gone.
    ///
    /// Dropping the worker drops every member's outbox, which closes their
    /// connections.
    pub async fn run(mut self) {
        tracing::debug!(echo = self.config.echo, "Hub worker started");

        while let Some(event) = self.intake.recv().await {
            self.apply(event);
        }

        tracing::info!(members = self.members.len(), "Hub worker stopped");
    }

    fn apply(&mut self, event: HubEvent) {
        tracing::trace!(event = event.name(), "Applying event");

        let mut admission = None;
        match event {
            HubEvent::Join { member, reply } => {
                // The peer stopped waiting; it could never leave, so don't admit it
                if reply.is_closed() {
                    tracing::debug!(addr = ?member.context.peer_addr, "Join abandoned before admission");
                } else {
                    admission = Some((self.admit(member), reply));
                }
            }
            HubEvent::Leave { id } => self.leave(id),
            HubEvent::Broadcast { message, origin } => {
                self.stats.record_broadcast();
                let skip = if self.config.echo { None } else { origin };
                self.fan_out(FanOut {
                    message,
                    origin,
                    skip,
                });
            }
        }

        self.publish_roster(1);

        // Replying last means `join` returns once the peer is visible in the
        // roster and the other members were notified
        if let Some((id, reply)) = admission {
            if reply.send(id).is_err() {
                tracing::debug!(peer = %id, "Join abandoned during admission");
                self.leave(id);
                self.publish_roster(0);
            }
        }
    }

    fn admit(&mut self, pending: PendingMember) -> PeerId {
        let id = PeerId::new(self.next_id);
        self.next_id += 1;

        let addr = pending.context.peer_addr;
        self.members
            .insert(id, Member::new(pending.outbox, pending.context));
        self.roster_dirty = true;
        self.stats.record_join(self.members.len());

        tracing::info!(
            peer = %id,
            addr = ?addr,
            members = self.members.len(),
            "Peer admitted"
        );

        self.fan_out(FanOut {
            message: Message::system(PEER_JOINED),
            origin: None,
            skip: Some(id),
        });

        id
    }

    fn leave(&mut self, id: PeerId) {
        if self.remove(id, "left") {
            self.stats.record_leave(self.members.len());
            self.fan_out(FanOut {
                message: Message::system(PEER_DISCONNECTED),
                origin: None,
                skip: None,
            });
        } else {
            tracing::debug!(peer = %id, "Leave for absent peer ignored");
        }
    }

    fn remove(&mut self, id: PeerId, reason: &'static str) -> bool {
        match self.members.remove(&id) {
            Some(member) => {
                self.roster_dirty = true;
                tracing::info!(
                    peer = %id,
                    reason = reason,
                    addr = ?member.context.peer_addr,
                    admitted_for = ?member.admitted_at.elapsed(),
                    members = self.members.len(),
                    "Peer removed"
                );
                true
            }
            None => false,
        }
    }

    /// Perform a fan-out, then remove every member that could not take it.
    ///
    /// Each removal announces itself with a notice, which may in turn find
    /// more dead members; the queue runs until no failures remain.
    fn fan_out(&mut self, first: FanOut) {
        let mut queue = VecDeque::from([first]);

        while let Some(job) = queue.pop_front() {
            for id in self.deliver(job) {
                if self.remove(id, "delivery failed") {
                    self.stats.record_eviction(self.members.len());
                    queue.push_back(FanOut {
                        message: Message::system(PEER_DISCONNECTED),
                        origin: None,
                        skip: None,
                    });
                }
            }
        }
    }

    /// Queue one message for every member; returns the members that failed
    fn deliver(&self, job: FanOut) -> Vec<PeerId> {
        let frame = match job.message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode message, skipping fan-out");
                return Vec::new();
            }
        };

        let mut recipients = 0;
        let mut failed = Vec::new();

        for (&id, member) in &self.members {
            if job.skip == Some(id) {
                continue;
            }
            match member.deliver(frame.clone()) {
                Ok(()) => recipients += 1,
                Err(DeliveryFailure::Closed) => {
                    tracing::debug!(peer = %id, "Delivery failed: connection closed");
                    failed.push(id);
                }
                Err(DeliveryFailure::Full) => {
                    tracing::warn!(peer = %id, "Delivery failed: outbox full, evicting slow peer");
                    failed.push(id);
                }
            }
        }

        self.stats.record_fan_out(recipients, failed.len());

        tracing::trace!(
            origin = ?job.origin,
            kind = job.message.kind,
            recipients = recipients,
            failed = failed.len(),
            "Fan-out complete"
        );

        // No subscribers is fine
        let _ = self.deliveries.send(Delivery {
            message: job.message,
            origin: job.origin,
            recipients,
            evicted: failed.clone(),
        });

        failed
    }

    fn publish_roster(&mut self, applied: u64) {
        if std::mem::take(&mut self.roster_dirty) {
            let mut members: Vec<PeerId> = self.members.keys().copied().collect();
            members.sort_unstable();
            self.roster.send_modify(|roster| {
                roster.members = members;
                roster.applied += applied;
            });
        } else if applied > 0 {
            self.roster.send_modify(|roster| roster.applied += applied);
        }
    }
}
