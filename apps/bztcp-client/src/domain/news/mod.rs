//! News Record Types
//!
//! Payload types carried by `STREAM` messages. These map directly onto the
//! JSON objects pushed by the server.
//!
//! # Wire Format (JSON)
//! ```json
//! {"id":1,"title":"t","body":"b","authors":[{"name":"a"}],
//!  "published":"...","updated":"...","channels":["News"],
//!  "tickers":["AAPL",{"name":"MSFT","primary":true,"sentiment":1}],
//!  "status":"Active","link":null}
//! ```
//!
//! Tickers arrive in two shapes: a bare symbol string, or a detailed object.
//! The shape is chosen by looking at the first significant byte of the value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use thiserror::Error;

use super::error::ProtocolError;

// =============================================================================
// Stream Record
// =============================================================================

/// A news record delivered by a `STREAM` message.
///
/// Missing fields fall back to their defaults; `null` lists decode as empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamData {
    /// Story identifier.
    pub id: i64,

    /// Headline.
    pub title: String,

    /// Story body (usually HTML).
    pub body: String,

    /// Authors in byline order. Omitted from output when empty.
    #[serde(
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub authors: Vec<Author>,

    /// Publication timestamp, as sent by the server.
    #[serde(rename = "published")]
    pub published_at: String,

    /// Last update timestamp, as sent by the server.
    #[serde(rename = "updated")]
    pub updated_at: String,

    /// Channels the story belongs to.
    #[serde(deserialize_with = "null_as_empty")]
    pub channels: Vec<String>,

    /// Symbols associated with the story.
    #[serde(deserialize_with = "null_as_empty")]
    pub tickers: Vec<Ticker>,

    /// Story status (e.g. "Active", "Removed").
    pub status: String,

    /// Opaque link value; its shape is not defined by the protocol.
    pub link: serde_json::Value,
}

impl StreamData {
    /// Iterate over the symbol names of all tickers, in wire order.
    pub fn ticker_names(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(Ticker::name)
    }

    /// Tickers flagged as primary for this story.
    pub fn primary_tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.tickers.iter().filter(|t| t.is_primary())
    }
}

/// A story author.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Tickers
// =============================================================================

/// Detailed ticker record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickerDetail {
    /// Symbol name.
    pub name: String,

    /// Whether this is the story's primary symbol.
    #[serde(default)]
    pub primary: bool,

    /// Sentiment score assigned by the publisher.
    #[serde(default)]
    pub sentiment: i64,

    /// Marks an "extended" ticker. Never serialized; set by consumers that
    /// classify symbols themselves.
    #[serde(skip)]
    pub extended: bool,
}

/// A symbol attached to a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ticker {
    /// Bare symbol name (`"AAPL"` on the wire).
    PlainName(String),
    /// Detailed record (`{"name":"AAPL","primary":true,"sentiment":1}` on the wire).
    Detailed(TickerDetail),
}

/// Errors produced while decoding a single ticker value.
#[derive(Debug, Error)]
pub enum TickerError {
    /// The value started with an unsupported byte.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The value had a supported shape but invalid JSON.
    #[error("invalid ticker JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The value was empty.
    #[error("empty ticker value")]
    Empty,
}

impl Ticker {
    /// Decode a ticker from its raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::UnexpectedByte` when the first significant byte
    /// is neither `{` nor `"`, or a JSON error when the value is malformed.
    pub fn from_json(raw: &[u8]) -> Result<Self, TickerError> {
        let raw = raw.trim_ascii_start();

        match raw.first() {
            Some(b'{') => Ok(Self::Detailed(serde_json::from_slice(raw)?)),
            Some(b'"') => Ok(Self::PlainName(serde_json::from_slice(raw)?)),
            Some(&byte) => Err(ProtocolError::UnexpectedByte(byte).into()),
            None => Err(TickerError::Empty),
        }
    }

    /// Symbol name regardless of shape.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::PlainName(name) => name,
            Self::Detailed(detail) => &detail.name,
        }
    }

    /// Primary flag; plain names are never primary.
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        match self {
            Self::PlainName(_) => false,
            Self::Detailed(detail) => detail.primary,
        }
    }

    /// Sentiment score; plain names carry none and report zero.
    #[must_use]
    pub const fn sentiment(&self) -> i64 {
        match self {
            Self::PlainName(_) => 0,
            Self::Detailed(detail) => detail.sentiment,
        }
    }

    /// Extended flag; only detailed records can carry it.
    #[must_use]
    pub const fn is_extended(&self) -> bool {
        match self {
            Self::PlainName(_) => false,
            Self::Detailed(detail) => detail.extended,
        }
    }
}

impl From<&str> for Ticker {
    fn from(name: &str) -> Self {
        Self::PlainName(name.to_string())
    }
}

impl From<TickerDetail> for Ticker {
    fn from(detail: TickerDetail) -> Self {
        Self::Detailed(detail)
    }
}

impl<'de> Deserialize<'de> for Ticker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Self::from_json(raw.get().as_bytes()).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Ticker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::PlainName(name) => serializer.serialize_str(name),
            Self::Detailed(detail) => detail.serialize(serializer),
        }
    }
}
