use std::fmt;

/// Message types carried in the first header field of a v2 TCP frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    /// Replace the connection's decompression state (`1`)
    ResetCompressor,
    /// JSON document (`2`)
    Json,
    /// Table-oriented compact GPB (`3`)
    GpbCompact,
    /// Self-describing key-value GPB (`4`)
    GpbKeyValue,
}

impl MsgType {
    /// Largest value a v2 `msg_type` may take. Anything above it on the wire
    /// is a v1 envelope length instead.
    pub const MAX_VALUE: u32 = 4;

    pub fn as_u32(self) -> u32 {
        match self {
            Self::ResetCompressor => 1,
            Self::Json => 2,
            Self::GpbCompact => 3,
            Self::GpbKeyValue => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResetCompressor => "RESET_COMPRESSOR",
            Self::Json => "JSON",
            Self::GpbCompact => "GPB_COMPACT",
            Self::GpbKeyValue => "GPB_KEY_VALUE",
        }
    }
}

/// A `msg_type` value outside `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid TCP message type")]
pub struct UnknownMsgType(pub u32);

impl TryFrom<u32> for MsgType {
    type Error = UnknownMsgType;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ResetCompressor),
            2 => Ok(Self::Json),
            3 => Ok(Self::GpbCompact),
            4 => Ok(Self::GpbKeyValue),
            other => Err(UnknownMsgType(other)),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.as_u32())
    }
}

/// Flags word of a v2 TCP frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u32);

impl Flags {
    /// Payload is zlib-compressed through the connection's shared stream.
    pub const ZLIB_COMPRESSION: Flags = Flags(0x1);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_compressed(self) -> bool {
        self.contains(Self::ZLIB_COMPRESSION)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_compressed() {
            names.push("ZLIB compression");
        }
        if names.is_empty() {
            f.write_str("None")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}
