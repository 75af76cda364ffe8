//! Application Layer - Port definitions.
//!
//! This layer contains the port interfaces that define how the stream
//! client interacts with its collaborators: the byte transport, the clock
//! used for ping timestamps and the caller's record sink.

/// Port interfaces for external systems (transport, clock, record sink).
pub mod ports;
