//! In-process connection backed by channels
//!
//! Useful for peers that live inside the same process (bots, bridges) and
//! for driving the hub from tests. The [`MemoryClient`] end plays the remote
//! side: it sends frames to the peer and sees what the hub delivered.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::message::Message;

use super::{Connection, Frame, FrameReader, FrameWriter};

#[derive(Debug, Default)]
struct Shared {
    fail_writes: AtomicBool,
    closes: AtomicUsize,
}

/// Create a connected pair
pub fn channel() -> (MemoryConnection, MemoryClient) {
    let (to_peer, inbound) = mpsc::unbounded_channel();
    let (outbound, from_hub) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());

    let connection = MemoryConnection {
        inbound,
        outbound,
        shared: Arc::clone(&shared),
    };
    let client = MemoryClient {
        to_peer: Some(to_peer),
        from_hub,
        shared,
    };

    (connection, client)
}

/// Peer side of an in-process connection
#[derive(Debug)]
pub struct MemoryConnection {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<Frame>,
    shared: Arc<Shared>,
}

impl Connection for MemoryConnection {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (MemoryReader, MemoryWriter) {
        (
            MemoryReader {
                inbound: self.inbound,
            },
            MemoryWriter {
                outbound: Some(self.outbound),
                shared: self.shared,
            },
        )
    }
}

/// Reading half of a [`MemoryConnection`]
#[derive(Debug)]
pub struct MemoryReader {
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl FrameReader for MemoryReader {
    async fn receive(&mut self) -> Result<Option<Frame>> {
        Ok(self.inbound.recv().await)
    }
}

/// Writing half of a [`MemoryConnection`]
#[derive(Debug)]
pub struct MemoryWriter {
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    shared: Arc<Shared>,
}

impl FrameWriter for MemoryWriter {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        if self.shared.fail_writes.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        match self.outbound {
            Some(ref outbound) => outbound.send(frame).map_err(|_| Error::ConnectionClosed),
            None => Err(Error::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.shared.closes.fetch_add(1, Ordering::AcqRel);
        self.outbound = None;
        Ok(())
    }
}

/// Remote end of an in-process connection
#[derive(Debug)]
pub struct MemoryClient {
    to_peer: Option<mpsc::UnboundedSender<Frame>>,
    from_hub: mpsc::UnboundedReceiver<Frame>,
    shared: Arc<Shared>,
}

impl MemoryClient {
    /// Send a frame to the peer
    pub fn send(&self, frame: Frame) -> Result<()> {
        match self.to_peer {
            Some(ref tx) => tx.send(frame).map_err(|_| Error::ConnectionClosed),
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Send a text frame to the peer
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Frame::Text(text.into()))
    }

    /// Wait for the next frame the hub delivered.
    ///
    /// Returns `None` once the peer closed the connection and every
    /// delivered frame was read.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_hub.recv().await
    }

    /// Wait for the next delivered frame and decode it as a message
    pub async fn recv_message(&mut self) -> Option<Message> {
        match self.recv().await? {
            Frame::Text(text) => serde_json::from_str(&text).ok(),
            Frame::Binary(_) => None,
        }
    }

    /// Take every message delivered so far without waiting
    pub fn drain_messages(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(frame) = self.from_hub.try_recv() {
            if let Frame::Text(text) = frame {
                if let Ok(message) = serde_json::from_str(&text) {
                    messages.push(message);
                }
            }
        }
        messages
    }

    /// Hang up; the peer's reader sees an orderly close
    pub fn disconnect(&mut self) {
        self.to_peer = None;
    }

    /// Make every following write on the peer side fail
    pub fn fail_writes(&self) {
        self.shared.fail_writes.store(true, Ordering::Release);
    }

    /// How many times the peer side called `close`
    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_between_ends() {
        let (conn, mut client) = channel();
        let (mut reader, mut writer) = conn.split();

        client.send_text("ping").unwrap();
        assert_eq!(reader.receive().await.unwrap(), Some(Frame::Text("ping".into())));

        writer.send(Message::text("pong").to_frame().unwrap()).await.unwrap();
        assert_eq!(client.recv_message().await, Some(Message::text("pong")));
    }

    #[tokio::test]
    async fn test_disconnect_and_close() {
        let (conn, mut client) = channel();
        let (mut reader, mut writer) = conn.split();

        client.disconnect();
        assert_eq!(reader.receive().await.unwrap(), None);

        writer.close().await.unwrap();
        assert_eq!(client.close_count(), 1);
        assert_eq!(client.recv().await, None);
        assert!(writer.send(Frame::Text("late".into())).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let (conn, client) = channel();
        let (_reader, mut writer) = conn.split();

        client.fail_writes();
        assert!(matches!(
            writer.send(Frame::Text("x".into())).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
