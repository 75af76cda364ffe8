//! Session Lifecycle
//!
//! A session moves strictly forward:
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Streaming -> Closed
//! ```
//!
//! Any state may jump to `Closed` (failure or shutdown). There are no backward
//! edges and no retry edges; a closed session is never reused.

use std::fmt;

use thiserror::Error;

/// Current state of a BZTCP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No transport yet.
    #[default]
    Disconnected,
    /// Transport is being opened.
    Connecting,
    /// Transport is open; READY/AUTH exchange in progress.
    Authenticating,
    /// Authenticated; keep-alive and read loop running.
    Streaming,
    /// Terminal state.
    Closed,
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal session transition: {from} -> {to}")]
pub struct StateError {
    /// State the session was in.
    pub from: SessionState,
    /// State that was requested.
    pub to: SessionState,
}

impl SessionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        }
    }

    /// Check whether records can currently be delivered.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Check whether the session has ended.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_advance_to(&self, next: Self) -> bool {
        matches!(
            (*self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Authenticating)
                | (Self::Authenticating, Self::Streaming)
                | (
                    Self::Disconnected | Self::Connecting | Self::Authenticating | Self::Streaming,
                    Self::Closed
                )
        )
    }

    /// Move to `next`, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns `StateError` for backward, repeated or post-close transitions.
    pub const fn advance(&mut self, next: Self) -> Result<Self, StateError> {
        if self.can_advance_to(next) {
            *self = next;
            Ok(next)
        } else {
            Err(StateError {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let mut state = SessionState::default();
        assert_eq!(state, SessionState::Disconnected);

        state.advance(SessionState::Connecting).unwrap();
        state.advance(SessionState::Authenticating).unwrap();
        state.advance(SessionState::Streaming).unwrap();
        assert!(state.is_streaming());

        state.advance(SessionState::Closed).unwrap();
        assert!(state.is_closed());
    }

    #[test]
    fn failure_closes_from_any_live_state() {
        for start in [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::Authenticating,
            SessionState::Streaming,
        ] {
            let mut state = start;
            assert_eq!(state.advance(SessionState::Closed), Ok(SessionState::Closed));
        }
    }

    #[test]
    fn backward_transitions_rejected() {
        let mut state = SessionState::Streaming;
        let err = state.advance(SessionState::Authenticating).unwrap_err();
        assert_eq!(err.from, SessionState::Streaming);
        assert_eq!(err.to, SessionState::Authenticating);
        assert_eq!(state, SessionState::Streaming);
    }

    #[test]
    fn skipping_authentication_rejected() {
        let mut state = SessionState::Connecting;
        assert!(state.advance(SessionState::Streaming).is_err());
    }

    #[test]
    fn closed_is_terminal() {
        let mut state = SessionState::Closed;
        assert!(state.advance(SessionState::Closed).is_err());
        assert!(state.advance(SessionState::Connecting).is_err());
    }

    #[test]
    fn error_display() {
        let err = StateError {
            from: SessionState::Closed,
            to: SessionState::Streaming,
        };
        assert_eq!(err.to_string(), "illegal session transition: closed -> streaming");
    }
}
