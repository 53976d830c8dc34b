//! Length-prefixed CBOR framing.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────┐
//! │ length: u32 (BE) │ CBOR Envelope { msg_id, body }│
//! └──────────────────┴──────────────────────────────┘
//! ```
//!
//! The prefix is checked against [`MAX_FRAME_SIZE`] before any body buffer is
//! allocated, so a hostile peer cannot make us reserve gigabytes by lying
//! about the length.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::{ProtocolError, Result};

/// Size of the big-endian length prefix.
pub const PREFIX_SIZE: usize = 4;

/// Largest accepted frame body (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// A message body tagged with its message id.
///
/// Responses echo the id of the request they answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Message id, unique per connection.
    pub msg_id: u64,
    /// Request or response carried by this frame.
    pub body: T,
}

impl<T> Envelope<T> {
    /// Create an envelope.
    pub fn new(msg_id: u64, body: T) -> Self {
        Self { msg_id, body }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Encode as a complete frame: length prefix followed by the CBOR body.
    pub fn encode(&self) -> Result<Bytes> {
        let mut body = Vec::new();
        ciborium::into_writer(self, &mut body)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;

        if body.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: body.len(), max: MAX_FRAME_SIZE });
        }

        let mut frame = BytesMut::with_capacity(PREFIX_SIZE + body.len());
        frame.put_u32(body.len() as u32);
        frame.put_slice(&body);
        Ok(frame.freeze())
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode a frame body (the bytes after the length prefix).
    pub fn decode_body(body: &[u8]) -> Result<Self> {
        ciborium::from_reader(body).map_err(|e| ProtocolError::Decode(e.to_string()))
    }

    /// Decode a complete frame, prefix included.
    ///
    /// Trailing bytes past the announced length are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let Some(prefix) = frame.get(..PREFIX_SIZE) else {
            return Err(ProtocolError::Truncated { expected: PREFIX_SIZE, actual: frame.len() });
        };
        let mut header = [0u8; PREFIX_SIZE];
        header.copy_from_slice(prefix);
        let len = body_len(header)?;

        let body = &frame[PREFIX_SIZE..];
        match body.get(..len) {
            Some(body) => Self::decode_body(body),
            None => Err(ProtocolError::Truncated { expected: len, actual: body.len() }),
        }
    }
}

/// Validate a length prefix and return the body size it announces.
pub fn body_len(prefix: [u8; PREFIX_SIZE]) -> Result<usize> {
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_FRAME_SIZE });
    }
    Ok(len)
}
