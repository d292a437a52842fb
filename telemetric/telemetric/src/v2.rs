//! Current (v2) header framing: `msg_type`, `flags` and
//! payload `length`, each a big-endian u32, followed by the payload.

use telemetric_core::Flags;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct V2Header {
    pub msg_type: u32,
    pub flags: Flags,
    pub length: u32,
}

/// Read the rest of a v2 header whose `msg_type` word was already consumed.
pub(crate) async fn read_header<R>(reader: &mut R, msg_type: u32) -> Result<V2Header, SessionError>
where
    R: AsyncRead + Unpin,
{
    let flags = Flags::from_bits(reader.read_u32().await?);
    let length = reader.read_u32().await?;
    Ok(V2Header {
        msg_type,
        flags,
        length,
    })
}
