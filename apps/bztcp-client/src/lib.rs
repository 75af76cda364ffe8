#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! BZTCP Client - News Stream Consumer
//!
//! A client for the BZTCP line protocol: a persistent duplex connection that,
//! after a username/key handshake, pushes news records as JSON lines.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: News records and the session lifecycle
//!   - `news`: `StreamData`, `Ticker`, `Author`
//!   - `session`: `SessionState` transitions
//!   - `error`: protocol violation kinds
//!
//! - **Application**: Port definitions
//!   - `ports`: `Transport`, `Clock`, `RecordSink`
//!
//! - **Infrastructure**: Adapters and process wiring
//!   - `bztcp`: codec, handshake, keep-alive and session
//!   - `config`: configuration from the environment
//!   - `metrics`: Prometheus counters
//!   - `telemetry`: tracing subscriber
//!
//! # Data Flow
//!
//! ```text
//!              ┌──────────────┐  Message  ┌──────────────┐  StreamData  ┌────────────┐
//! server ────► │  LineCodec   │ ────────► │  read loop   │ ───────────► │ RecordSink │
//!              └──────────────┘           └──────────────┘              └────────────┘
//!                     ▲
//!                     │ PING every 20s
//!              ┌──────────────┐
//!              │  KeepAlive   │
//!              └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - News records and session lifecycle, no I/O.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::error::ProtocolError;
pub use domain::news::{Author, StreamData, Ticker, TickerDetail, TickerError};
pub use domain::session::{SessionState, StateError};

// Ports
pub use application::ports::{Clock, RecordSink, SystemClock, Transport};

// Protocol client
pub use infrastructure::bztcp::{
    ClientError, Credentials, LineCodec, Message, Session, StateHandle, parse_timestamp,
};

// Configuration
pub use infrastructure::config::{ClientConfig, ConfigError, RuntimeSettings};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, init as init_telemetry};
