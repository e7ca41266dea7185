//! WebSocket connection over tokio-tungstenite

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;

use crate::error::{Error, Result};

use super::{Connection, Frame, FrameReader, FrameWriter};

/// An upgraded WebSocket stream
pub struct WsConnection<S> {
    stream: WebSocketStream<S>,
    idle_timeout: Option<Duration>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an upgraded stream
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self {
            stream,
            idle_timeout: None,
        }
    }

    /// Fail the reader if no frame arrives within `timeout`
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

impl<S> Connection for WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Reader = WsReader<S>;
    type Writer = WsWriter<S>;

    fn split(self) -> (WsReader<S>, WsWriter<S>) {
        let (sink, stream) = self.stream.split();
        (
            WsReader {
                stream,
                idle_timeout: self.idle_timeout,
            },
            WsWriter { sink },
        )
    }
}

/// Reading half of a [`WsConnection`]
pub struct WsReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
    idle_timeout: Option<Duration>,
}

impl<S> FrameReader for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn receive(&mut self) -> Result<Option<Frame>> {
        loop {
            let next = match self.idle_timeout {
                Some(limit) => tokio::time::timeout(limit, self.stream.next())
                    .await
                    .map_err(|_| Error::IdleTimeout)?,
                None => self.stream.next().await,
            };

            match next {
                None | Some(Ok(WsMessage::Close(_))) => return Ok(None),
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(WsMessage::Text(text))) => return Ok(Some(Frame::Text(text.to_string()))),
                Some(Ok(WsMessage::Binary(data))) => {
                    return Ok(Some(Frame::Binary(Bytes::copy_from_slice(data.as_slice()))))
                }
                // Pings are answered by tungstenite itself
                Some(Ok(_)) => continue,
            }
        }
    }
}

/// Writing half of a [`WsConnection`]
pub struct WsWriter<S> {
    sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

impl<S> FrameWriter for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let message = match frame {
            Frame::Text(text) => WsMessage::text(text),
            Frame::Binary(data) => WsMessage::binary(data.to_vec()),
        };
        self.sink.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    async fn pair() -> (
        WsConnection<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (server_io, client_io) = duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (WsConnection::new(server), client)
    }

    #[tokio::test]
    async fn test_receive_text_and_binary() {
        let (conn, mut client) = pair().await;
        let (mut reader, _writer) = conn.split();

        client.send(WsMessage::text("hi")).await.unwrap();
        client.send(WsMessage::binary(vec![1u8, 2, 3])).await.unwrap();

        assert_eq!(reader.receive().await.unwrap(), Some(Frame::Text("hi".into())));
        assert_eq!(
            reader.receive().await.unwrap(),
            Some(Frame::Binary(Bytes::from_static(&[1, 2, 3])))
        );
    }

    #[tokio::test]
    async fn test_close_frame_ends_reader() {
        let (conn, mut client) = pair().await;
        let (mut reader, _writer) = conn.split();

        client.close(None).await.unwrap();
        assert_eq!(reader.receive().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_reaches_client() {
        let (conn, mut client) = pair().await;
        let (_reader, mut writer) = conn.split();

        writer.send(Frame::Text("out".into())).await.unwrap();
        let received = client.next().await.unwrap().unwrap();
        assert_eq!(received.into_text().unwrap().to_string(), "out");
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let (conn, _client) = pair().await;
        let (mut reader, _writer) = conn
            .idle_timeout(Some(Duration::from_millis(20)))
            .split();

        assert!(matches!(reader.receive().await, Err(Error::IdleTimeout)));
    }
}
