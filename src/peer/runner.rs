//! Peer read loop and writer task
//!
//! ```text
//!   connection.split()
//!     ├── reader ──► read loop ──► hub.broadcast()
//!     └── writer ◄── writer task ◄── outbox ◄── hub fan-out
//! ```
//!
//! The peer never writes to its own connection. The writer task drains the
//! outbox the hub fills, and closes the connection when the hub lets go of
//! the outbox (leave or eviction) or a write fails.

use tokio::sync::mpsc;

use crate::connection::{Connection, Frame, FrameReader, FrameWriter};
use crate::error::{Error, Result};
use crate::hub::WeakHub;
use crate::message::Message;
use crate::stats::PeerStats;

use super::config::PeerConfig;
use super::context::PeerContext;
use super::state::PeerState;

/// One connection bridged into the hub's event stream
pub struct Peer<C: Connection> {
    connection: C,
    hub: WeakHub,
    context: PeerContext,
    config: PeerConfig,
    state: PeerState,
}

impl<C: Connection> Peer<C> {
    /// Bind a connection to a hub. The peer is pending until [`Peer::run`]
    /// gets it admitted.
    pub fn new(connection: C, hub: WeakHub, context: PeerContext, config: PeerConfig) -> Self {
        Self {
            connection,
            hub,
            context,
            config,
            state: PeerState::new(),
        }
    }

    /// Connection details
    pub fn context(&self) -> &PeerContext {
        &self.context
    }

    /// Join the hub, forward every inbound message until the connection
    /// ends, then leave.
    ///
    /// Read and write failures end the peer normally and are not returned
    /// as errors. An error means the hub itself was unavailable.
    pub async fn run(self) -> Result<PeerStats> {
        let Self {
            connection,
            hub,
            context,
            config,
            mut state,
        } = self;
        let mut stats = PeerStats::new();

        let (mut reader, writer) = connection.split();
        let (outbox, queue) = mpsc::channel(config.outbox_capacity.max(1));
        let mut writer_task = tokio::spawn(write_loop(writer, queue));

        // On failure the outbox is dropped with the event, so the writer
        // closes the connection on its own
        let id = match hub.join(outbox, context.clone()).await {
            Ok(id) => id,
            Err(e) => {
                state.retire();
                tracing::debug!(addr = ?context.peer_addr, error = %e, "Admission failed");
                if let Err(e) = writer_task.await {
                    tracing::warn!(addr = ?context.peer_addr, error = %e, "Writer task failed");
                }
                return Err(e.into());
            }
        };
        let admitted = state.admit(id);
        debug_assert!(admitted, "peer admitted twice");
        tracing::debug!(peer = %id, addr = ?context.peer_addr, "Read loop started");

        let mut writer_done = false;
        let outcome: Result<()> = loop {
            let received = tokio::select! {
                _ = &mut writer_task => None,
                received = reader.receive() => Some(received),
            };

            let frame = match received {
                // Writer is gone: evicted, or the connection broke on write
                None => {
                    writer_done = true;
                    break Ok(());
                }
                Some(Ok(Some(frame))) => frame,
                Some(Ok(None)) => break Ok(()),
                Some(Err(e)) => {
                    tracing::debug!(peer = %id, error = %e, "Read failed");
                    break Ok(());
                }
            };

            stats.frames_received += 1;
            match Message::from_frame(frame, config.max_body_len) {
                Ok(message) => {
                    if let Err(e) = hub.broadcast(message, Some(id)).await {
                        break Err(Error::Hub(e));
                    }
                    stats.messages_forwarded += 1;
                }
                Err(e) => {
                    stats.frames_dropped += 1;
                    tracing::debug!(peer = %id, error = %e, "Dropped malformed frame");
                }
            }
        };

        if let Err(e) = hub.leave(id).await {
            tracing::debug!(peer = %id, error = %e, "Leave not delivered");
        }
        let retired = state.retire();
        debug_assert!(retired, "peer retired twice");

        if !writer_done {
            if let Err(e) = writer_task.await {
                tracing::warn!(peer = %id, error = %e, "Writer task failed");
            }
        }

        stats.peer_id = state.id();
        stats.phase = state.phase();
        stats.membership = state.membership();
        stats.duration = state.age();
        tracing::debug!(
            peer = %id,
            frames = stats.frames_received,
            forwarded = stats.messages_forwarded,
            dropped = stats.frames_dropped,
            "Peer retired"
        );

        outcome.map(|()| stats)
    }
}

/// Drain the outbox into the connection, then close it exactly once
async fn write_loop<W: FrameWriter>(mut writer: W, mut queue: mpsc::Receiver<Frame>) {
    while let Some(frame) = queue.recv().await {
        if let Err(e) = writer.send(frame).await {
            tracing::debug!(error = %e, "Write failed");
            break;
        }
    }

    // Hub sees the outbox as closed from here on
    queue.close();

    if let Err(e) = writer.close().await {
        tracing::debug!(error = %e, "Close failed");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::*;
    use crate::connection::memory::{self, MemoryClient};
    use crate::hub::{Hub, HubConfig, HubError};
    use crate::message::{PEER_DISCONNECTED, PEER_JOINED};
    use crate::peer::PeerPhase;

    const WAIT: Duration = Duration::from_secs(5);

    /// Start a peer and wait until the hub has admitted it
    async fn spawn_peer(
        hub: &Hub,
        config: PeerConfig,
    ) -> (JoinHandle<Result<PeerStats>>, MemoryClient) {
        let (conn, client) = memory::channel();
        let expected = hub.members().len() + 1;
        let peer = Peer::new(conn, hub.downgrade(), PeerContext::local(), config);

        let task = tokio::spawn(peer.run());
        let mut roster = hub.roster();
        timeout(WAIT, roster.wait_for(|r| r.len() == expected))
            .await
            .expect("peer not admitted")
            .unwrap();

        (task, client)
    }

    async fn next(client: &mut MemoryClient) -> Message {
        timeout(WAIT, client.recv_message())
            .await
            .expect("no message delivered")
            .expect("connection closed")
    }

    #[tokio::test]
    async fn test_join_notices() {
        let hub = Hub::start(HubConfig::default());
        let (_t1, mut c1) = spawn_peer(&hub, PeerConfig::default()).await;
        let (_t2, mut c2) = spawn_peer(&hub, PeerConfig::default()).await;

        assert_eq!(next(&mut c1).await, Message::system(PEER_JOINED));
        assert!(c1.drain_messages().is_empty());
        assert!(c2.drain_messages().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_scenario() {
        let hub = Hub::start(HubConfig::default());
        let (_t1, mut c1) = spawn_peer(&hub, PeerConfig::default()).await;
        let (_t2, mut c2) = spawn_peer(&hub, PeerConfig::default()).await;
        let (_t3, mut c3) = spawn_peer(&hub, PeerConfig::default()).await;

        // P1 saw two joins, P2 one, P3 none
        assert_eq!(next(&mut c1).await, Message::system(PEER_JOINED));
        assert_eq!(next(&mut c1).await, Message::system(PEER_JOINED));
        assert_eq!(next(&mut c2).await, Message::system(PEER_JOINED));

        c1.send_text(r#"{"type":1,"body":"hello"}"#).unwrap();

        let hello = Message::text("hello");
        assert_eq!(next(&mut c2).await, hello);
        assert_eq!(next(&mut c3).await, hello);
        // Echo is on by default
        assert_eq!(next(&mut c1).await, hello);
    }

    #[tokio::test]
    async fn test_raw_text_is_wrapped() {
        let hub = Hub::start(HubConfig::default().echo(false));
        let (_t1, c1) = spawn_peer(&hub, PeerConfig::default()).await;
        let (_t2, mut c2) = spawn_peer(&hub, PeerConfig::default()).await;

        c1.send_text("typed by hand").unwrap();
        assert_eq!(next(&mut c2).await, Message::text("typed by hand"));
    }

    #[tokio::test]
    async fn test_disconnect_notifies_and_closes_once() {
        let hub = Hub::start(HubConfig::default());
        let (t1, mut c1) = spawn_peer(&hub, PeerConfig::default()).await;
        let (_t2, mut c2) = spawn_peer(&hub, PeerConfig::default()).await;
        assert_eq!(next(&mut c1).await, Message::system(PEER_JOINED));

        c1.send_text("bye").unwrap();
        assert_eq!(next(&mut c2).await, Message::text("bye"));

        c1.disconnect();
        let stats = timeout(WAIT, t1).await.unwrap().unwrap().unwrap();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.messages_forwarded, 1);
        assert_eq!(stats.phase, PeerPhase::Retired);
        assert!(stats.membership.is_some());
        let id = stats.peer_id.expect("peer was admitted");

        assert_eq!(next(&mut c2).await, Message::system(PEER_DISCONNECTED));
        assert_eq!(c1.close_count(), 1);
        assert_eq!(hub.members().len(), 1);
        assert!(!hub.members().contains(&id));
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let hub = Hub::start(HubConfig::default().echo(false));
        let config = PeerConfig::default().max_body_len(5);
        let (t1, mut c1) = spawn_peer(&hub, config).await;
        let (_t2, mut c2) = spawn_peer(&hub, PeerConfig::default()).await;
        assert_eq!(next(&mut c1).await, Message::system(PEER_JOINED));

        c1.send_text("far too long").unwrap();
        c1.send(Frame::Binary(bytes::Bytes::from_static(&[0xc3, 0x28])))
            .unwrap();
        c1.send_text("ok").unwrap();

        // Only the valid frame made it through
        assert_eq!(next(&mut c2).await, Message::text("ok"));

        c1.disconnect();
        let stats = timeout(WAIT, t1).await.unwrap().unwrap().unwrap();
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.frames_dropped, 2);
        assert_eq!(stats.messages_forwarded, 1);
    }

    #[tokio::test]
    async fn test_failed_writer_retires_peer() {
        let hub = Hub::start(HubConfig::default());
        let (_t1, mut c1) = spawn_peer(&hub, PeerConfig::default()).await;
        let (t2, c2) = spawn_peer(&hub, PeerConfig::default()).await;
        assert_eq!(next(&mut c1).await, Message::system(PEER_JOINED));

        c2.fail_writes();
        c1.send_text("anyone?").unwrap();

        // P1 still gets its own message and exactly one departure notice
        assert_eq!(next(&mut c1).await, Message::text("anyone?"));
        assert_eq!(next(&mut c1).await, Message::system(PEER_DISCONNECTED));

        timeout(WAIT, t2).await.unwrap().unwrap().unwrap();
        assert_eq!(c2.close_count(), 1);
        assert_eq!(hub.members().len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(c1.drain_messages().is_empty());
    }

    #[tokio::test]
    async fn test_zero_outbox_capacity_in_literal_config() {
        let hub = Hub::start(HubConfig::default());
        let config = PeerConfig {
            outbox_capacity: 0,
            max_body_len: 0,
        };
        let (_t1, mut c1) = spawn_peer(&hub, config).await;

        c1.send_text("hello").unwrap();
        assert_eq!(next(&mut c1).await, Message::text("hello"));
    }

    #[tokio::test]
    async fn test_closed_hub_rejects_peer() {
        let hub = Hub::start(HubConfig::default());
        let weak = hub.downgrade();
        drop(hub);

        let (conn, mut client) = memory::channel();
        let peer = Peer::new(conn, weak, PeerContext::local(), PeerConfig::default());
        let result = timeout(WAIT, peer.run()).await.unwrap();

        assert!(matches!(result, Err(Error::Hub(HubError::Closed))));
        assert_eq!(client.close_count(), 1);
        assert_eq!(client.recv().await, None);
    }
}
