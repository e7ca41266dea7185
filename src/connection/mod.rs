//! Abstract bidirectional connection
//!
//! The hub core never touches sockets. It consumes a [`Connection`] that can
//! be split into a reading half, owned by the peer's read loop, and a
//! writing half, owned by the peer's writer task and fed only by the hub.
//!
//! ```text
//!              Connection::split()
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//!    FrameReader               FrameWriter
//!    receive() ──► Peer ──► Hub ──► outbox ──► send() / close()
//! ```

pub mod memory;
pub mod websocket;

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

pub use memory::{MemoryClient, MemoryConnection};
pub use websocket::WsConnection;

/// A single transport frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame
    Binary(Bytes),
}

/// A connection that can be split into independent read and write halves
pub trait Connection: Send + 'static {
    /// Reading half
    type Reader: FrameReader;
    /// Writing half
    type Writer: FrameWriter;

    /// Split into reader and writer
    fn split(self) -> (Self::Reader, Self::Writer);
}

/// Reading half of a connection
pub trait FrameReader: Send + 'static {
    /// Wait for the next frame.
    ///
    /// `Ok(None)` signals an orderly close. Control frames are handled by
    /// the implementation and never surface here.
    fn receive(&mut self) -> impl Future<Output = Result<Option<Frame>>> + Send;
}

/// Writing half of a connection
pub trait FrameWriter: Send + 'static {
    /// Send one frame
    fn send(&mut self, frame: Frame) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
