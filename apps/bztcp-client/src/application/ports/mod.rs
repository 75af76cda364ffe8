//! Port Interfaces
//!
//! Defines the interfaces (ports) the client depends on, following the
//! Hexagonal Architecture pattern. Infrastructure adapters implement these.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Transport`: duplex byte stream with an optional keep-alive toggle
//! - `Clock`: wall-clock source for keep-alive timestamps
//!
//! ## Driver Ports (Inbound)
//!
//! - `RecordSink`: receives decoded STREAM records, in order, synchronously

use std::io;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::news::StreamData;

/// A duplex byte transport the session can run over.
///
/// Plain TCP, TLS over TCP and in-memory pipes all qualify. Transports that
/// have no notion of socket keep-alive keep the default no-op toggle.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Enable or disable transport-level keep-alive probes.
    ///
    /// # Errors
    ///
    /// Returns the underlying socket error if the option cannot be set.
    fn set_keepalive(&self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Receiver of decoded STREAM records.
///
/// Called inline from the read loop; the next line is not read until the
/// call returns.
pub trait RecordSink {
    /// Handle one record.
    fn on_record(&mut self, record: StreamData);
}

impl<F> RecordSink for F
where
    F: FnMut(StreamData),
{
    fn on_record(&mut self, record: StreamData) {
        (*self)(record);
    }
}
