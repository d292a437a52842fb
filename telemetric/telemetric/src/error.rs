//! Error types for the receiver pipeline.

use std::{io, net::SocketAddr};

use telemetric_core::{DecodeError, UnknownMsgType};

/// Errors produced by a [`CompressionContext`](crate::CompressionContext).
#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    /// The zlib stream is corrupt, or out of step with the sender's
    /// compressor (e.g. after a missed reset).
    #[error("zlib stream error: {0}")]
    Inflate(#[from] flate2::DecompressError),
}

/// Malformed framing inside an otherwise complete v1 envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("unknown v1 TLV type {0}")]
    UnknownTlvType(u32),

    #[error("truncated v1 TLV: needed {needed} bytes, {remaining} remaining")]
    TruncatedTlv { needed: usize, remaining: usize },
}

/// Errors produced while reading and decoding messages on one connection.
///
/// Use [`SessionError::is_fatal`] to tell errors that end the session from
/// errors that only lose the current message.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport read failed, including a peer closing mid-message.
    #[error("connection read failed: {0}")]
    Io(#[from] io::Error),

    /// A declared length exceeds the configured limit. The stream cannot be
    /// resynchronised after this.
    #[error("declared length {length} exceeds the {limit} byte limit")]
    Oversize { length: u32, limit: usize },

    #[error(transparent)]
    UnknownMsgType(#[from] UnknownMsgType),

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("failed to decompress payload: {0}")]
    Decompression(#[from] CompressionError),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Whether the session must stop after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::Io(_) => true,
            SessionError::Oversize { .. } => true,
            SessionError::UnknownMsgType(_) => false,
            SessionError::Framing(_) => false,
            SessionError::Decompression(_) => false,
            SessionError::Decode(_) => false,
            SessionError::Json(_) => false,
        }
    }
}

/// Errors produced while binding or serving the listeners.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid listen address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
