//! Handles used to talk to the hub worker

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::message::Message;
use crate::peer::PeerContext;
use crate::stats::{HubStats, HubStatsSnapshot};

use super::config::HubConfig;
use super::error::HubError;
use super::event::{HubEvent, Outbox, PeerId, PendingMember};
use super::member::{Delivery, Roster};
use super::worker::HubWorker;

/// Strong handle to a running hub.
///
/// Cheap to clone. The worker keeps running while at least one `Hub`
/// exists; peers only hold a [`WeakHub`].
#[derive(Clone)]
pub struct Hub {
    intake: mpsc::Sender<HubEvent>,
    roster: watch::Receiver<Roster>,
    deliveries: broadcast::Sender<Delivery>,
    stats: Arc<HubStats>,
}

impl Hub {
    /// Create a hub and the worker that drives it.
    ///
    /// The worker must be run (`worker.run().await`) for events to be
    /// applied. Use [`Hub::start`] to spawn it on the current runtime.
    pub fn new(config: HubConfig) -> (Self, HubWorker) {
        // Fields are public, so a literal can bypass the builder clamps
        let (intake_tx, intake_rx) = mpsc::channel(config.intake_capacity.max(1));
        let (roster_tx, roster_rx) = watch::channel(Roster::default());
        let (deliveries, _) = broadcast::channel(config.delivery_feed_capacity.max(1));
        let stats = Arc::new(HubStats::new());

        let worker = HubWorker::new(
            intake_rx,
            config,
            roster_tx,
            deliveries.clone(),
            Arc::clone(&stats),
        );

        let hub = Self {
            intake: intake_tx,
            roster: roster_rx,
            deliveries,
            stats,
        };

        (hub, worker)
    }

    /// Create a hub and spawn its worker
    pub fn start(config: HubConfig) -> Self {
        let (hub, worker) = Self::new(config);
        tokio::spawn(worker.run());
        hub
    }

    /// Non-owning handle for peers
    pub fn downgrade(&self) -> WeakHub {
        WeakHub {
            intake: self.intake.downgrade(),
        }
    }

    /// Admit a peer; resolves once it is a member and the other members
    /// were notified
    pub async fn join(&self, outbox: Outbox, context: PeerContext) -> Result<PeerId, HubError> {
        join(&self.intake, outbox, context).await
    }

    /// Remove a peer; removing an absent peer is a no-op
    pub async fn leave(&self, id: PeerId) -> Result<(), HubError> {
        send(&self.intake, HubEvent::Leave { id }).await
    }

    /// Fan a message out to every member
    pub async fn broadcast(&self, message: Message, origin: Option<PeerId>) -> Result<(), HubError> {
        send(&self.intake, HubEvent::Broadcast { message, origin }).await
    }

    /// Like [`Hub::broadcast`] but fails with [`HubError::IntakeFull`]
    /// instead of waiting for intake capacity
    pub fn try_broadcast(&self, message: Message, origin: Option<PeerId>) -> Result<(), HubError> {
        self.intake
            .try_send(HubEvent::Broadcast { message, origin })
            .map_err(|e| match e {
                TrySendError::Full(_) => HubError::IntakeFull,
                TrySendError::Closed(_) => HubError::Closed,
            })
    }

    /// Watch the member set as the worker publishes it
    pub fn roster(&self) -> watch::Receiver<Roster> {
        self.roster.clone()
    }

    /// Currently admitted peers, sorted by id
    pub fn members(&self) -> Vec<PeerId> {
        self.roster.borrow().members.clone()
    }

    /// Subscribe to the record of completed fan-outs.
    ///
    /// The feed is lossy: a subscriber that falls behind skips entries.
    pub fn subscribe_deliveries(&self) -> broadcast::Receiver<Delivery> {
        self.deliveries.subscribe()
    }

    /// Current counters
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Non-owning handle to a hub.
///
/// Does not keep the worker alive; every operation fails with
/// [`HubError::Closed`] once the last [`Hub`] is dropped.
#[derive(Clone)]
pub struct WeakHub {
    intake: mpsc::WeakSender<HubEvent>,
}

impl WeakHub {
    fn upgrade(&self) -> Result<mpsc::Sender<HubEvent>, HubError> {
        self.intake.upgrade().ok_or(HubError::Closed)
    }

    /// See [`Hub::join`]
    pub async fn join(&self, outbox: Outbox, context: PeerContext) -> Result<PeerId, HubError> {
        join(&self.upgrade()?, outbox, context).await
    }

    /// See [`Hub::leave`]
    pub async fn leave(&self, id: PeerId) -> Result<(), HubError> {
        send(&self.upgrade()?, HubEvent::Leave { id }).await
    }

    /// See [`Hub::broadcast`]
    pub async fn broadcast(&self, message: Message, origin: Option<PeerId>) -> Result<(), HubError> {
        send(&self.upgrade()?, HubEvent::Broadcast { message, origin }).await
    }
}

async fn send(intake: &mpsc::Sender<HubEvent>, event: HubEvent) -> Result<(), HubError> {
    intake.send(event).await.map_err(|_| HubError::Closed)
}

async fn join(
    intake: &mpsc::Sender<HubEvent>,
    outbox: Outbox,
    context: PeerContext,
) -> Result<PeerId, HubError> {
    let (reply, admitted) = oneshot::channel();
    let member = PendingMember { outbox, context };

    send(intake, HubEvent::Join { member, reply }).await?;
    admitted.await.map_err(|_| HubError::Closed)
}
