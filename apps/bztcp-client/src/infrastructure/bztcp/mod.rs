//! BZTCP Protocol Client
//!
//! Line-delimited, duplex push protocol:
//!
//! - `codec`: line framing (`STATUS[: PAYLOAD]=BZEOT\r\n`)
//! - `messages`: status vocabulary, handshake/keep-alive payloads, timestamps
//! - `auth`: READY/AUTH/CONNECTED exchange
//! - `writer`: serialized outbound path shared by the session and the prober
//! - `keepalive`: periodic PING task
//! - `transport`: TCP/TLS dialing
//! - `client`: the session tying it together

pub mod auth;
pub mod client;
pub mod codec;
pub mod error;
pub mod keepalive;
pub mod messages;
pub mod transport;
pub mod writer;

pub use auth::Credentials;
pub use client::{Session, StateHandle};
pub use codec::{EOL, LineCodec, Message};
pub use error::{ClientError, Result};
pub use keepalive::{KeepAlive, KeepAliveConfig};
pub use messages::{AuthData, PingData, PongData, TIME_FORMAT, format_timestamp, parse_timestamp};
pub use transport::{BoxedTransport, dial};
pub use writer::FrameWriter;
