//! BZTCP Session
//!
//! Owns one authenticated connection: runs the handshake, then the read loop
//! with its companion keep-alive prober.
//!
//! # Lifecycle
//!
//! ```text
//! connect()/handshake()          stream(cancel, sink)
//!   Connecting -> Authenticating -> Streaming -> Closed
//! ```
//!
//! A failed handshake closes the transport and leaves the session `Closed`.
//! There is no reconnect: callers build a new session.
//!
//! # Cancellation
//!
//! `stream` takes a `CancellationToken`. Once it fires the prober stops, closes
//! the write half, and the read loop returns `Ok(())` whatever the last read
//! produced. Dropping the `stream` future stops the prober as well.

use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::{AsyncRead, ReadHalf, WriteHalf};
use tokio_util::codec::{Framed, FramedRead};
use tokio_util::sync::CancellationToken;

use super::auth;
use super::codec::{LineCodec, Message};
use super::error::{ClientError, Result};
use super::keepalive::{KeepAlive, KeepAliveConfig};
use super::messages::status;
use super::transport::{self, BoxedTransport};
use super::writer::FrameWriter;
use crate::application::ports::{Clock, RecordSink, SystemClock, Transport};
use crate::domain::error::ProtocolError;
use crate::domain::news::StreamData;
use crate::domain::session::{SessionState, StateError};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::metrics;

// =============================================================================
// State Handle
// =============================================================================

/// Shared, observable session state.
///
/// Cloning yields another view of the same state, so callers can keep one
/// after `Session::stream` consumes the session.
#[derive(Debug, Clone, Default)]
pub struct StateHandle(Arc<RwLock<SessionState>>);

impl StateHandle {
    /// Current state.
    #[must_use]
    pub fn get(&self) -> SessionState {
        *self.0.read()
    }

    fn advance(&self, next: SessionState) -> std::result::Result<(), StateError> {
        let mut state = self.0.write();
        let from = *state;
        state.advance(next)?;
        tracing::info!(%from, to = %next, "Session state changed");
        Ok(())
    }

    fn close(&self) {
        let mut state = self.0.write();
        if !state.is_closed() {
            let from = *state;
            *state = SessionState::Closed;
            tracing::info!(%from, to = %SessionState::Closed, "Session state changed");
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated BZTCP session.
pub struct Session<T: Transport = BoxedTransport> {
    reader: FramedRead<ReadHalf<T>, LineCodec>,
    writer: Arc<FrameWriter<WriteHalf<T>>>,
    state: StateHandle,
    keepalive: KeepAliveConfig,
    clock: Arc<dyn Clock>,
}

impl Session<BoxedTransport> {
    /// Dial `config.addr` and authenticate.
    ///
    /// # Errors
    ///
    /// Returns `ConnectTimeout`/`Transport`/`Tls` if the connection cannot be
    /// opened, or any handshake error (see [`Session::handshake`]).
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let state = StateHandle::default();
        state.advance(SessionState::Connecting)?;
        tracing::info!(addr = %config.addr, tls = config.tls, "Connecting");

        let transport =
            match transport::dial(&config.addr, config.tls, config.connect_timeout).await {
                Ok(transport) => transport,
                Err(err) => {
                    state.close();
                    metrics::record_session_error(err.kind());
                    tracing::error!(addr = %config.addr, error = %err, "Connect failed");
                    return Err(err);
                }
            };

        Self::authenticate(transport, config, state).await
    }
}

impl<T: Transport> Session<T> {
    /// Authenticate over an already-open transport.
    ///
    /// The whole READY/AUTH exchange is bounded by `config.auth_timeout`. On
    /// success the transport's keep-alive is enabled, if it has one.
    ///
    /// # Errors
    ///
    /// Returns the protocol error for a rejected handshake, `AuthTimeout` when
    /// the deadline passes, or the transport error. The transport is closed
    /// before the error is returned.
    pub async fn handshake(transport: T, config: &ClientConfig) -> Result<Self> {
        let state = StateHandle::default();
        state.advance(SessionState::Connecting)?;
        Self::authenticate(transport, config, state).await
    }

    async fn authenticate(transport: T, config: &ClientConfig, state: StateHandle) -> Result<Self> {
        state.advance(SessionState::Authenticating)?;

        let mut framed = Framed::new(transport, LineCodec::new());
        let deadline = config.auth_timeout;
        let exchange = auth::exchange(&mut framed, &config.credentials);
        let outcome = match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::AuthTimeout(deadline)),
        };

        if let Err(err) = outcome {
            drop(framed);
            state.close();
            metrics::record_session_error(err.kind());
            tracing::error!(
                error = %err,
                kind = err.kind(),
                rejected = err.protocol().is_some_and(ProtocolError::is_auth_failure),
                "Handshake failed"
            );
            return Err(err);
        }

        if let Err(err) = framed.get_ref().set_keepalive(true) {
            tracing::warn!(error = %err, "Failed to enable transport keep-alive");
        }

        let parts = framed.into_parts();
        let codec = parts.codec;
        let (read_half, write_half) = tokio::io::split(parts.io);

        let mut reader = FramedRead::new(read_half, codec);
        // Lines the server sent right after CONNECTED may already be buffered.
        reader.read_buffer_mut().extend_from_slice(&parts.read_buf);

        state.advance(SessionState::Streaming)?;
        tracing::info!(user = config.credentials.username(), "Authenticated");

        Ok(Self {
            reader,
            writer: Arc::new(FrameWriter::with_codec(write_half, codec)),
            state,
            keepalive: config.keepalive(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used for PING timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Observable handle on the session state.
    #[must_use]
    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Shared writer, for sending alongside a running stream.
    #[must_use]
    pub fn sender(&self) -> Arc<FrameWriter<WriteHalf<T>>> {
        Arc::clone(&self.writer)
    }

    /// Read and decode the next line.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionClosed` at end of stream, or the decode/I/O error.
    pub async fn recv(&mut self) -> Result<Message> {
        self.reader.next().await.ok_or(ClientError::ConnectionClosed)?
    }

    /// Send `status`, with `body` JSON-encoded as the payload when present.
    ///
    /// # Errors
    ///
    /// Returns `Decode` if the body cannot be serialized, otherwise the write
    /// error.
    pub async fn send<B: Serialize + ?Sized>(&self, status: &str, body: Option<&B>) -> Result<()> {
        match body {
            Some(body) => self.writer.send_json(status, body).await,
            None => self.writer.send_status(status).await,
        }
    }

    /// Deliver STREAM records to `sink` until cancelled or the connection fails.
    ///
    /// Records reach the sink in wire order, one at a time; the next line is
    /// not read until `on_record` returns.
    ///
    /// # Errors
    ///
    /// Returns the first transport, protocol or decode error seen before
    /// cancellation, or `ConnectionClosed` if the server hangs up.
    pub async fn stream<S: RecordSink>(self, cancel: CancellationToken, mut sink: S) -> Result<()> {
        let Self {
            mut reader,
            writer,
            state,
            keepalive,
            clock,
        } = self;

        let prober_cancel = cancel.child_token();
        // Dropping this future must stop the prober too.
        let _prober_guard = prober_cancel.clone().drop_guard();
        let prober = tokio::spawn(
            KeepAlive::new(keepalive, Arc::clone(&writer), clock, prober_cancel.clone()).run(),
        );

        let result = read_loop(&mut reader, &cancel, &mut sink).await;

        prober_cancel.cancel();
        match prober.await {
            Ok(pings) => tracing::debug!(pings, "Keep-alive stopped"),
            Err(err) => tracing::warn!(error = %err, "Keep-alive task failed"),
        }
        state.close();

        match &result {
            Ok(()) => tracing::info!("Stream ended"),
            Err(err) => {
                metrics::record_session_error(err.kind());
                tracing::error!(error = %err, kind = err.kind(), "Stream failed");
            }
        }
        result
    }
}

async fn read_loop<R, S>(
    reader: &mut FramedRead<R, LineCodec>,
    cancel: &CancellationToken,
    sink: &mut S,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    S: RecordSink,
{
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            next = reader.next() => next,
        };

        // Errors caused by our own shutdown are not failures.
        if cancel.is_cancelled() {
            return Ok(());
        }

        let msg = next.ok_or(ClientError::ConnectionClosed)??;
        dispatch(&msg, sink)?;
    }
}

fn dispatch<S: RecordSink>(msg: &Message, sink: &mut S) -> Result<()> {
    match msg.status.as_str() {
        status::PONG => {
            metrics::record_pong_received();
            tracing::trace!("Received pong");
        }
        status::STREAM => {
            let record: StreamData = msg.json()?;
            tracing::trace!(id = record.id, "Received record");
            metrics::record_delivered();
            sink.on_record(record);
        }
        other => {
            metrics::record_ignored();
            tracing::debug!(status = other, "Ignoring message");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bztcp::auth::Credentials;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

    const RECORD: &[u8] = b"STREAM: {\"id\":7,\"title\":\"t\",\"body\":\"b\",\"published\":\"p\",\"updated\":\"u\",\"channels\":[],\"tickers\":[],\"status\":\"Published\",\"link\":null}=BZEOT\r\n";

    fn config() -> ClientConfig {
        ClientConfig::new(Credentials::new("bztest", "12345"))
    }

    async fn session_with(server_lines: &[u8]) -> (Session<DuplexStream>, DuplexStream) {
        let (client, mut server) = duplex(64 * 1024);
        server.write_all(b"READY=BZEOT\r\nCONNECTED=BZEOT\r\n").await.unwrap();
        server.write_all(server_lines).await.unwrap();
        let session = Session::handshake(client, &config()).await.unwrap();
        (session, server)
    }

    #[test]
    fn dispatch_routes_by_status() {
        let mut records = Vec::new();
        let mut sink = |r: StreamData| records.push(r);

        dispatch(&Message::new("PONG"), &mut sink).unwrap();
        dispatch(&Message::new("SOMETHING NEW"), &mut sink).unwrap();
        dispatch(&Message::decode(RECORD).unwrap(), &mut sink).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 7);
    }

    #[test]
    fn dispatch_rejects_bad_payload() {
        let mut records = Vec::new();
        let mut sink = |r: StreamData| records.push(r);

        let err = dispatch(&Message::with_data("STREAM", &b"{not json"[..]), &mut sink)
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));

        let err = dispatch(&Message::new("STREAM"), &mut sink).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn handshake_reaches_streaming() {
        let (session, _server) = session_with(b"").await;
        assert_eq!(session.state().get(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn buffered_lines_survive_handshake() {
        let (mut session, _server) = session_with(RECORD).await;
        let msg = session.recv().await.unwrap();
        assert_eq!(msg.status, "STREAM");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_hits_auth_timeout() {
        let (client, _server) = duplex(1024);
        let config = ClientConfig {
            auth_timeout: Duration::from_secs(3),
            ..config()
        };

        let err = Session::handshake(client, &config).await.err().unwrap();
        assert!(matches!(err, ClientError::AuthTimeout(d) if d == Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn rejected_key() {
        let (client, mut server) = duplex(1024);
        server.write_all(b"READY=BZEOT\r\nINVALID KEY FORMAT=BZEOT\r\n").await.unwrap();

        let err = Session::handshake(client, &config()).await.err().unwrap();
        assert_eq!(err.protocol(), Some(&ProtocolError::InvalidKeyFormat));
    }

    #[tokio::test]
    async fn stream_ends_when_server_hangs_up() {
        let (session, server) = session_with(RECORD).await;
        let state = session.state();
        drop(server);

        let mut count = 0;
        let err = session
            .stream(CancellationToken::new(), |_: StreamData| count += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ConnectionClosed));
        assert_eq!(count, 1);
        assert_eq!(state.get(), SessionState::Closed);
    }

    #[tokio::test]
    async fn malformed_line_is_fatal() {
        let (session, _server) = session_with(b"garbage\r\n").await;
        let err = session
            .stream(CancellationToken::new(), |_: StreamData| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err.protocol(),
            Some(ProtocolError::MalformedLine(_))
        ));
    }
}
