//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the port interfaces defined in the
//! application layer, plus process wiring for the binary.

/// BZTCP protocol client (codec, handshake, keep-alive, session).
pub mod bztcp;

/// Configuration loaded from the environment.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber setup.
pub mod telemetry;
