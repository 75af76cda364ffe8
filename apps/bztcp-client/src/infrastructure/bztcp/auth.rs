//! BZTCP Authentication
//!
//! Handles the credential handshake that opens every session. The server
//! must be authenticated against within a bounded deadline (10 seconds by
//! default) after the transport is opened.
//!
//! # Authentication Flow
//!
//! 1. Receive `READY` from the server (anything else fails with `InvalidReady`
//!    and no credentials are sent)
//! 2. Send `AUTH: {"username":"...","key":"..."}`
//! 3. Receive `CONNECTED`, or an error status
//!
//! # Error Statuses
//!
//! - `INVALID KEY FORMAT`: the server could not decode the AUTH payload
//! - `INVALID KEY`: the username or key was rejected
//! - anything else: `InvalidAuthResponse`

use futures_util::{Sink, SinkExt, Stream, StreamExt};

use super::codec::Message;
use super::error::{ClientError, Result};
use super::messages::{AuthData, status};
use crate::domain::error::ProtocolError;

// =============================================================================
// Credentials
// =============================================================================

/// BZTCP account credentials.
///
/// The `Debug` implementation redacts the key for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    key: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    /// Get the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Build the AUTH payload.
    #[must_use]
    pub fn to_auth_data(&self) -> AuthData {
        AuthData {
            username: self.username.clone(),
            key: self.key.clone(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Response Classification
// =============================================================================

/// Check the server's opening message.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidReady` unless the status is `READY`.
pub fn check_ready(msg: &Message) -> std::result::Result<(), ProtocolError> {
    if msg.status == status::READY {
        Ok(())
    } else {
        Err(ProtocolError::InvalidReady)
    }
}

/// Classify the server's answer to AUTH.
///
/// # Errors
///
/// Returns the matching `ProtocolError` for every status except `CONNECTED`.
pub fn classify_auth_response(msg: &Message) -> std::result::Result<(), ProtocolError> {
    match msg.status.as_str() {
        status::CONNECTED => Ok(()),
        status::INVALID_KEY_FORMAT => Err(ProtocolError::InvalidKeyFormat),
        status::INVALID_KEY => Err(ProtocolError::InvalidKey),
        _ => Err(ProtocolError::InvalidAuthResponse),
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// Run the READY / AUTH / response exchange over a framed transport.
///
/// The caller is responsible for the deadline.
///
/// # Errors
///
/// Returns a protocol error for unexpected statuses, `ConnectionClosed` if the
/// peer hangs up, or the underlying transport/JSON error.
pub async fn exchange<F>(framed: &mut F, credentials: &Credentials) -> Result<()>
where
    F: Stream<Item = Result<Message>> + Sink<Message, Error = ClientError> + Unpin,
{
    let ready = framed.next().await.ok_or(ClientError::ConnectionClosed)??;
    check_ready(&ready)?;
    tracing::debug!("Received READY, sending credentials");

    let auth = Message::with_json(status::AUTH, &credentials.to_auth_data())?;
    framed.send(auth).await?;

    let response = framed.next().await.ok_or(ClientError::ConnectionClosed)??;
    classify_auth_response(&response).inspect_err(|err| {
        tracing::warn!(status = %response.status, error = %err, "Authentication rejected");
    })?;

    Ok(())
}
