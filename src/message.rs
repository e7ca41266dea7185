//! Wire-level message exchanged between peers
//!
//! Every frame the hub sends is a compact JSON record with an integer `type`
//! and a string `body`:
//!
//! ```text
//! {"type":1,"body":"hello"}
//! ```
//!
//! Inbound frames are more lenient. Browsers usually send the raw text the
//! user typed, so a text frame that is not a JSON message is wrapped as a
//! text message instead of being rejected.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connection::Frame;

/// Kind tag for text messages and system notices
pub const KIND_TEXT: i64 = 1;

/// Kind tag for messages that arrived as binary frames
pub const KIND_BINARY: i64 = 2;

/// Notice body sent to the other members when a peer is admitted
pub const PEER_JOINED: &str = "peer joined";

/// Notice body sent to the remaining members when a peer is removed
pub const PEER_DISCONNECTED: &str = "peer disconnected";

/// A message fanned out by the hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Kind tag, serialized as `type`
    #[serde(rename = "type")]
    pub kind: i64,
    /// Message text
    pub body: String,
}

impl Message {
    /// Create a message with an explicit kind
    pub fn new(kind: i64, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// Create a text message
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(KIND_TEXT, body)
    }

    /// Create a system notice
    pub fn system(body: impl Into<String>) -> Self {
        Self::new(KIND_TEXT, body)
    }

    /// Encode as a JSON text frame
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::Text)
    }

    /// Decode an inbound frame.
    ///
    /// `max_body_len` of 0 disables the length check.
    pub fn from_frame(frame: Frame, max_body_len: usize) -> Result<Self, DecodeError> {
        let message = match frame {
            Frame::Text(text) => Self::from_text(text),
            Frame::Binary(data) => Self::from_binary(data)?,
        };

        if max_body_len > 0 && message.body.len() > max_body_len {
            return Err(DecodeError::BodyTooLong {
                len: message.body.len(),
                max: max_body_len,
            });
        }

        Ok(message)
    }

    fn from_text(text: String) -> Self {
        if text.trim_start().starts_with('{') {
            if let Ok(message) = serde_json::from_str::<Message>(&text) {
                return message;
            }
        }
        Self::text(text)
    }

    fn from_binary(data: Bytes) -> Result<Self, DecodeError> {
        let body = std::str::from_utf8(&data).map_err(|_| DecodeError::InvalidUtf8)?;
        Ok(Self::new(KIND_BINARY, body))
    }
}

/// Why an inbound frame was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Binary payload is not valid UTF-8
    #[error("frame payload is not valid UTF-8")]
    InvalidUtf8,
    /// Body exceeds the configured limit
    #[error("message body is {len} bytes, limit is {max}")]
    BodyTooLong { len: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let frame = Message::text("hello").to_frame().unwrap();
        assert_eq!(frame, Frame::Text(r#"{"type":1,"body":"hello"}"#.into()));
    }

    #[test]
    fn test_decode_json_text() {
        let frame = Frame::Text(r#"{"type":7,"body":"hi"}"#.into());
        let message = Message::from_frame(frame, 0).unwrap();
        assert_eq!(message, Message::new(7, "hi"));
    }

    #[test]
    fn test_decode_raw_text_is_wrapped() {
        let message = Message::from_frame(Frame::Text("just typing".into()), 0).unwrap();
        assert_eq!(message, Message::text("just typing"));

        // Looks like JSON but is not a message record
        let message = Message::from_frame(Frame::Text(r#"{"foo":1}"#.into()), 0).unwrap();
        assert_eq!(message.kind, KIND_TEXT);
        assert_eq!(message.body, r#"{"foo":1}"#);
    }

    #[test]
    fn test_decode_binary() {
        let frame = Frame::Binary(Bytes::from_static(b"bin"));
        assert_eq!(
            Message::from_frame(frame, 0).unwrap(),
            Message::new(KIND_BINARY, "bin")
        );

        let frame = Frame::Binary(Bytes::from_static(&[0xff, 0xfe]));
        assert_eq!(
            Message::from_frame(frame, 0),
            Err(DecodeError::InvalidUtf8)
        );
    }

    #[test]
    fn test_body_limit() {
        let frame = Frame::Text("abcdef".into());
        assert_eq!(
            Message::from_frame(frame.clone(), 4),
            Err(DecodeError::BodyTooLong { len: 6, max: 4 })
        );
        assert!(Message::from_frame(frame.clone(), 6).is_ok());
        assert!(Message::from_frame(frame, 0).is_ok());
    }

    #[test]
    fn test_system_notice_kind() {
        let notice = Message::system(PEER_JOINED);
        assert_eq!(notice.kind, 1);
        assert_eq!(notice, Message::text("peer joined"));
    }
}
