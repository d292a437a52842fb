//! Descriptor-driven decoders for compact and key-value GPB telemetry.
//!
//! A [`SchemaRegistry`] maps each table's schema path to a row message
//! descriptor. [`decode_compact`] and [`decode_key_value`] parse the two
//! payload encodings against it, and [`message_to_value`] projects any
//! decoded message into the schema-independent [`Value`].
//!
//! [`Value`]: telemetric_core::Value

mod baseline;
mod compact;
mod compiler;
mod kv;
mod options;
mod project;
mod registry;
mod render;
mod source;

pub use baseline::{COMPACT_HEADER_MESSAGE, KEY_VALUE_HEADER_MESSAGE};
pub use compact::{
    COMPACT_ENCODING, CompactHeader, CompactMessage, DecodedRow, DecodedRows, DecodedTable,
    NO_DECODER_PLACEHOLDER, TableEntry, decode_compact,
};
pub use compiler::{CompileError, SchemaCompiler};
pub use kv::{
    KeyValueField, KeyValueHeader, KeyValueMessage, MAX_FIELD_DEPTH, NO_NAME, ScalarValue,
    decode_key_value,
};
pub use options::DecodeOptions;
pub use project::message_to_value;
pub use registry::{RegistryError, SchemaRegistry, SchemaRegistryBuilder};
pub use source::{SchemaSource, SourceError};
