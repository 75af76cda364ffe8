//! Client Error Type
//!
//! Wraps protocol violations together with the transport, JSON and timing
//! failures that can end a session. Every variant is terminal; the client never
//! retries on its own.

use std::time::Duration;

use thiserror::Error;

use crate::domain::error::ProtocolError;
use crate::domain::session::StateError;

/// Errors returned by connect, handshake and stream operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Protocol violation (bad handshake response, malformed line, ...).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Underlying I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// JSON payload could not be encoded or decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Transport could not be opened in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// READY/AUTH exchange did not finish in time.
    #[error("authentication timed out after {0:?}")]
    AuthTimeout(Duration),

    /// Peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Session lifecycle violation.
    #[error(transparent)]
    State(#[from] StateError),
}

impl ClientError {
    /// The protocol error kind, if this is a protocol violation.
    #[must_use]
    pub const fn protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }

    /// Short stable label, used for metrics and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Protocol(err) => err.as_str(),
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Tls(_) => "tls",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::AuthTimeout(_) => "auth_timeout",
            Self::ConnectionClosed => "connection_closed",
            Self::State(_) => "state",
        }
    }
}

/// Result type alias using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_kind_is_exposed() {
        let err = ClientError::from(ProtocolError::InvalidKey);
        assert_eq!(err.protocol(), Some(&ProtocolError::InvalidKey));
        assert_eq!(err.kind(), "invalid_key");
        assert_eq!(err.to_string(), "invalid key");
    }

    #[test]
    fn non_protocol_errors_have_no_kind() {
        let err = ClientError::from(std::io::Error::other("boom"));
        assert!(err.protocol().is_none());
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.to_string(), "transport error: boom");
    }

    #[test]
    fn timeouts_report_duration() {
        let err = ClientError::AuthTimeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "authentication timed out after 10s");
    }
}
