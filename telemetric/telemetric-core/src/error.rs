//! Error types for the decoder layer.

/// Error returned when a structured payload cannot be decoded.
///
/// Every variant is scoped to a single message: callers log it and move on to
/// the next message on the same connection.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload bytes could not be parsed as the expected message.
    #[error("failed to decode message '{message_name}': {source}")]
    MessageDecode {
        message_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The compact header carried an unexpected `encoding` magic.
    #[error("invalid 'encoding' value {found:#x} (expected {expected:#x})")]
    EncodingMismatch { found: u32, expected: u32 },

    /// A field value did not match the kind declared by its descriptor.
    #[error("field '{field}' of '{message_name}' has unrecognised type: {detail}")]
    UnrecognisedFieldType {
        message_name: String,
        field: String,
        detail: String,
    },

    /// A baseline header message lacked a field the decoder relies on.
    #[error("header message '{message_name}' has no field '{field}'")]
    MissingHeaderField { message_name: String, field: String },

    /// A key-value field tree was nested deeper than the decoder accepts.
    #[error("field tree nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },
}

/// Error returned by typed [`Value`](crate::Value) accessors on variant mismatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type mismatch: expected {expected}, found {actual}")]
pub struct ValueTypeError {
    pub expected: String,
    pub actual: &'static str,
}

impl ValueTypeError {
    pub fn new(expected: impl Into<String>, actual: &'static str) -> Self {
        Self {
            expected: expected.into(),
            actual,
        }
    }
}
