//! Schema-independent core types for `telemetric`.
//!
//! This crate provides the generic [`Value`] projection target, the
//! [`MsgType`] / [`Flags`] header enums shared by both protocol generations,
//! and the [`DecodeError`] returned by the structured payload decoders.

mod error;
mod format;
mod msg_type;
mod value;

pub use error::{DecodeError, ValueTypeError};
pub use format::{format_bytes, format_timestamp};
pub use msg_type::{Flags, MsgType, UnknownMsgType};
pub use value::Value;
