//! Domain Layer - Core news record types and session lifecycle.
//!
//! This layer contains the core domain types for the BZTCP news stream.
//! Nothing here performs I/O; types carry serialization support only.

/// Protocol violation kinds shared by the codec, handshake and record decoding.
pub mod error;

/// News records delivered by STREAM messages.
pub mod news;

/// Connection lifecycle state machine.
pub mod session;
