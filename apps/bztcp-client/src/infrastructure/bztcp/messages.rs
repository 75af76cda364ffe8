//! BZTCP Message Payloads
//!
//! Status vocabulary and JSON payload types exchanged over the line protocol.
//!
//! # Handshake
//! ```text
//! < READY=BZEOT
//! > AUTH: {"username":"bztest","key":"12345"}=BZEOT
//! < CONNECTED=BZEOT            (or INVALID KEY FORMAT / INVALID KEY)
//! ```
//!
//! # Streaming
//! ```text
//! > PING: {"pingTime":"Mon Jan  2 2006 15:04:05 GMT+0000 (UTC)"}=BZEOT
//! < PONG: {"serverTime":"...","pingTime":"..."}=BZEOT
//! < STREAM: {...}=BZEOT
//! ```

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

// =============================================================================
// Status Vocabulary
// =============================================================================

/// Status tokens understood by the client.
pub mod status {
    /// Server is ready for credentials.
    pub const READY: &str = "READY";
    /// Client credentials.
    pub const AUTH: &str = "AUTH";
    /// Credentials accepted.
    pub const CONNECTED: &str = "CONNECTED";
    /// Credentials could not be parsed.
    pub const INVALID_KEY_FORMAT: &str = "INVALID KEY FORMAT";
    /// Credentials rejected.
    pub const INVALID_KEY: &str = "INVALID KEY";
    /// Client keep-alive probe.
    pub const PING: &str = "PING";
    /// Server keep-alive answer.
    pub const PONG: &str = "PONG";
    /// News record.
    pub const STREAM: &str = "STREAM";
}

// =============================================================================
// Payloads
// =============================================================================

/// Payload of the AUTH message.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    /// Account username.
    pub username: String,
    /// API key.
    pub key: String,
}

impl std::fmt::Debug for AuthData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthData")
            .field("username", &self.username)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Payload of the PING message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingData {
    /// Client time when the ping was sent.
    #[serde(rename = "pingTime")]
    pub ping_time: String,
}

impl PingData {
    /// Build a ping stamped with `now`, rendered with `layout`.
    #[must_use]
    pub fn at<Tz>(now: &DateTime<Tz>, layout: &str) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        Self {
            ping_time: format_timestamp(now, layout),
        }
    }
}

/// Payload of the PONG message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongData {
    /// Server time when the pong was sent, if reported.
    #[serde(
        rename = "serverTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_time: Option<String>,
    /// Echo of the ping time.
    #[serde(rename = "pingTime")]
    pub ping_time: String,
}

// =============================================================================
// Timestamps
// =============================================================================

/// Timestamp layout used throughout the protocol, e.g.
/// `Mon Jan  2 2006 15:04:05 GMT-0700 (MST)`.
pub const TIME_FORMAT: &str = "%a %b %e %Y %H:%M:%S GMT%z (%Z)";

/// Layout without the trailing zone abbreviation, used for parsing.
const PARSE_FORMAT: &str = "%a %b %e %Y %H:%M:%S GMT%z";

/// Render `time` with a chrono `layout` (normally [`TIME_FORMAT`]).
#[must_use]
pub fn format_timestamp<Tz>(time: &DateTime<Tz>, layout: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(layout).to_string()
}

/// Parse a protocol timestamp.
///
/// The parenthesised zone abbreviation is informational and ignored; the
/// numeric offset is authoritative.
///
/// # Errors
///
/// Returns a chrono parse error if the text does not follow the layout.
pub fn parse_timestamp(text: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let text = text.trim();
    let without_zone = match text.rfind(" (") {
        Some(idx) if text.ends_with(')') => &text[..idx],
        _ => text,
    };
    DateTime::parse_from_str(without_zone, PARSE_FORMAT)
}
