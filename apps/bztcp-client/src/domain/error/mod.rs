//! Protocol Error Kinds
//!
//! Terminal protocol violations. These are plain values so callers can compare
//! them directly; I/O and JSON failures are wrapped separately by the client.

use thiserror::Error;

/// A protocol-level failure surfaced by the handshake or decode paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The first message from the server was not `READY`.
    #[error("invalid ready message")]
    InvalidReady,

    /// The server answered AUTH with an unknown status.
    #[error("invalid auth response")]
    InvalidAuthResponse,

    /// The server could not parse the AUTH payload.
    #[error("invalid key format")]
    InvalidKeyFormat,

    /// The username or key was rejected.
    #[error("invalid key")]
    InvalidKey,

    /// A line carried neither `:` nor `=`.
    #[error("invalid line: {}", .0.escape_ascii())]
    MalformedLine(Vec<u8>),

    /// A ticker value started with something other than `{` or `"`.
    #[error("unexpected byte '{}'", .0.escape_ascii())]
    UnexpectedByte(u8),
}

impl ProtocolError {
    /// Short stable label, used for metrics and log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidReady => "invalid_ready",
            Self::InvalidAuthResponse => "invalid_auth_response",
            Self::InvalidKeyFormat => "invalid_key_format",
            Self::InvalidKey => "invalid_key",
            Self::MalformedLine(_) => "malformed_line",
            Self::UnexpectedByte(_) => "unexpected_byte",
        }
    }

    /// Whether this error was raised by the authentication exchange.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidReady | Self::InvalidAuthResponse | Self::InvalidKeyFormat | Self::InvalidKey
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_vocabulary() {
        assert_eq!(ProtocolError::InvalidReady.to_string(), "invalid ready message");
        assert_eq!(
            ProtocolError::InvalidAuthResponse.to_string(),
            "invalid auth response"
        );
        assert_eq!(ProtocolError::InvalidKeyFormat.to_string(), "invalid key format");
        assert_eq!(ProtocolError::InvalidKey.to_string(), "invalid key");
        assert_eq!(ProtocolError::UnexpectedByte(b'5').to_string(), "unexpected byte '5'");
    }

    #[test]
    fn malformed_line_escapes_control_bytes() {
        let err = ProtocolError::MalformedLine(b"garbage\r\n".to_vec());
        assert_eq!(err.to_string(), "invalid line: garbage\\r\\n");
    }

    #[test]
    fn kinds_are_comparable() {
        assert_eq!(ProtocolError::InvalidKey, ProtocolError::InvalidKey);
        assert_ne!(ProtocolError::InvalidKey, ProtocolError::InvalidKeyFormat);
        assert_eq!(
            ProtocolError::UnexpectedByte(b'x'),
            ProtocolError::UnexpectedByte(b'x')
        );
    }

    #[test]
    fn auth_failures_are_classified() {
        assert!(ProtocolError::InvalidReady.is_auth_failure());
        assert!(ProtocolError::InvalidKey.is_auth_failure());
        assert!(!ProtocolError::MalformedLine(vec![]).is_auth_failure());
        assert!(!ProtocolError::UnexpectedByte(b'1').is_auth_failure());
    }
}
