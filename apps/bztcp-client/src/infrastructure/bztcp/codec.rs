//! Line Codec
//!
//! Encoding and decoding of BZTCP lines.
//!
//! # Wire Format
//!
//! ```text
//! STATUS[: PAYLOAD]=BZEOT\r\n
//! ```
//!
//! The status ends at the first `:` or `=`. The payload, when present, ends
//! at the *last* `=` on the line, which always belongs to the terminator. This
//! keeps payloads containing `=` intact.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::{Decoder, Encoder};

use super::error::ClientError;
use crate::domain::error::ProtocolError;

/// End-of-line marker terminating every line.
pub const EOL: &[u8] = b"=BZEOT\r\n";

/// Separator written between status and payload.
pub const SEPARATOR: &[u8] = b": ";

// =============================================================================
// Message
// =============================================================================

/// One protocol line: a status and an optional raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Status token, e.g. `READY`, `AUTH`, `STREAM`.
    pub status: String,
    /// Raw payload bytes (JSON by convention), trimmed of surrounding whitespace.
    pub data: Option<Bytes>,
}

impl Message {
    /// Create a status-only message.
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            data: None,
        }
    }

    /// Create a message carrying raw payload bytes.
    #[must_use]
    pub fn with_data(status: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            status: status.into(),
            data: Some(data.into()),
        }
    }

    /// Create a message whose payload is `body` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(
        status: impl Into<String>,
        body: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::with_data(status, serde_json::to_vec(body)?))
    }

    /// Parse the payload as JSON. A missing payload parses as an empty document.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is absent or not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.data.as_deref().unwrap_or_default())
    }

    /// Decode one line, terminator included.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::MalformedLine` if the line holds neither `:` nor `=`.
    pub fn decode(line: &[u8]) -> Result<Self, ProtocolError> {
        let Some(delim) = line.iter().position(|b| matches!(b, b':' | b'=')) else {
            return Err(ProtocolError::MalformedLine(line.to_vec()));
        };

        let status = String::from_utf8_lossy(&line[..delim]).into_owned();

        // `delim` found an '=', so this search always succeeds.
        let end = line.iter().rposition(|&b| b == b'=').unwrap_or(delim);

        let data = (delim < end)
            .then(|| Bytes::copy_from_slice(line[delim + 1..end].trim_ascii()));

        Ok(Self { status, data })
    }

    /// Encode the message using the standard terminator.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_into(EOL, &mut buf);
        buf.freeze()
    }

    /// Append the encoded message to `dst`, finished by `terminator`.
    pub fn encode_into(&self, terminator: &[u8], dst: &mut BytesMut) {
        let payload_len = self.data.as_ref().map_or(0, |d| SEPARATOR.len() + d.len());
        dst.reserve(self.status.len() + payload_len + terminator.len());

        dst.put_slice(self.status.as_bytes());
        if let Some(data) = &self.data {
            dst.put_slice(SEPARATOR);
            dst.put_slice(data);
        }
        dst.put_slice(terminator);
    }
}

// =============================================================================
// Framing Codec
// =============================================================================

/// Stream framing for BZTCP lines.
///
/// Frames end at the final byte of the terminator (`\n`); each frame is then
/// decoded with [`Message::decode`].
#[derive(Debug, Clone, Copy)]
pub struct LineCodec {
    terminator: &'static [u8],
}

impl Default for LineCodec {
    fn default() -> Self {
        Self { terminator: EOL }
    }
}

impl LineCodec {
    /// Create a codec using the standard terminator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn frame_end(&self) -> u8 {
        self.terminator.last().copied().unwrap_or(b'\n')
    }
}

impl Decoder for LineCodec {
    type Item = Message;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ClientError> {
        let end = self.frame_end();
        let Some(pos) = src.iter().position(|&b| b == end) else {
            return Ok(None);
        };

        let line = src.split_to(pos + 1);
        Ok(Some(Message::decode(&line)?))
    }
}

impl Encoder<Message> for LineCodec {
    type Error = ClientError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), ClientError> {
        item.encode_into(self.terminator, dst);
        Ok(())
    }
}

impl Encoder<&Message> for LineCodec {
    type Error = ClientError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), ClientError> {
        item.encode_into(self.terminator, dst);
        Ok(())
    }
}
