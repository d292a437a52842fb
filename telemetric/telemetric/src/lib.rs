//! Receiver pipeline for model-driven telemetry.
//!
//! [`bind`] opens a TCP listener and a UDP socket on one port and a
//! [`TelemetryServer`] serves them. Each TCP connection becomes a [`Session`]
//! that detects the protocol generation of every message, undoes the framing
//! and zlib compression, and hands the payload to [`decode_payload`]. UDP
//! datagrams are decoded directly as compact GPB. Decoded messages go to a
//! [`MessageSink`].

mod compression;
mod error;
mod frame;
mod session;
mod sink;
mod transport;
pub mod v1;
mod v2;

pub use compression::CompressionContext;
pub use error::{CompressionError, FramingError, SessionError, TransportError};
pub use frame::{DEFAULT_MAX_MESSAGE_LEN, ProtocolVersion, TelemetryFrame};
pub use session::{Session, SessionEvent, decode_payload};
pub use sink::{DecodedMessage, MessageSink};
pub use transport::{
    ACCEPT_BACKOFF, Listeners, MAX_DATAGRAM_LEN, TelemetryServer, TelemetryServerBuilder, bind,
};
