//! Legacy (v1) envelope framing.
//!
//! A v1 message is a 4-byte envelope length followed by that many bytes of
//! TLVs. Each TLV starts with a 4-byte type and a 4-byte length:
//!
//! | type | meaning                                      |
//! |------|----------------------------------------------|
//! | 1    | reset the decompressor; the length is unused |
//! | 2    | `length` bytes of zlib-compressed JSON       |

use bytes::{Buf, Bytes};

use crate::error::FramingError;

const TLV_RESET: u32 = 1;
const TLV_CHUNK: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tlv {
    Reset,
    Chunk(Bytes),
}

/// Split a v1 envelope into its TLVs.
pub fn parse_envelope(mut envelope: Bytes) -> Result<Vec<Tlv>, FramingError> {
    let mut tlvs = Vec::new();
    while envelope.has_remaining() {
        let tlv_type = take_u32(&mut envelope)?;
        let length = take_u32(&mut envelope)? as usize;
        match tlv_type {
            TLV_RESET => tlvs.push(Tlv::Reset),
            TLV_CHUNK => {
                ensure_remaining(&envelope, length)?;
                tlvs.push(Tlv::Chunk(envelope.split_to(length)));
            }
            other => return Err(FramingError::UnknownTlvType(other)),
        }
    }
    Ok(tlvs)
}

fn take_u32(buf: &mut Bytes) -> Result<u32, FramingError> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_u32())
}

fn ensure_remaining(buf: &Bytes, needed: usize) -> Result<(), FramingError> {
    if buf.remaining() < needed {
        return Err(FramingError::TruncatedTlv {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}
