use std::io;

use bytes::Bytes;
use telemetric_core::{Flags, MsgType};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::SessionError;

/// Default upper bound on any declared envelope or payload length.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

const INITIAL_BODY_CAPACITY: usize = 64 * 1024;

/// Protocol generation of a TCP message, chosen from its first header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Legacy TLV envelope; the word is the envelope length.
    V1 { envelope_len: u32 },
    /// Fixed header; the word is the message type.
    V2 { msg_type: u32 },
}

impl ProtocolVersion {
    /// Message types never exceed [`MsgType::MAX_VALUE`], and a v1 envelope
    /// is always longer than that, so the first word alone tells them apart.
    pub fn detect(word: u32) -> Self {
        if word > MsgType::MAX_VALUE {
            ProtocolVersion::V1 { envelope_len: word }
        } else {
            ProtocolVersion::V2 { msg_type: word }
        }
    }
}

/// A complete TCP message after framing and decompression.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub msg_type: MsgType,
    pub flags: Flags,
    pub payload: Bytes,
}

/// Read the first header word of the next message.
///
/// Returns `None` when the peer closed the connection cleanly before the
/// first byte. A close part way through the word is an error.
pub(crate) async fn read_header_word<R>(reader: &mut R) -> Result<Option<u32>, SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut word = [0u8; 4];
    let n = reader.read(&mut word).await?;
    if n == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut word[n..]).await?;
    Ok(Some(u32::from_be_bytes(word)))
}

/// Read exactly `length` bytes after checking it against `limit`.
pub(crate) async fn read_body<R>(
    reader: &mut R,
    length: u32,
    limit: usize,
) -> Result<Bytes, SessionError>
where
    R: AsyncRead + Unpin,
{
    let len = length as usize;
    if len > limit {
        return Err(SessionError::Oversize { length, limit });
    }
    // Capacity follows the bytes received, not the declared length.
    let mut body = Vec::with_capacity(len.min(INITIAL_BODY_CAPACITY));
    (&mut *reader).take(length as u64).read_to_end(&mut body).await?;
    if body.len() < len {
        return Err(SessionError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("connection closed after {} of {len} bytes", body.len()),
        )));
    }
    Ok(Bytes::from(body))
}
