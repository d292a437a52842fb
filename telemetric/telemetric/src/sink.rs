use telemetric_core::MsgType;
use telemetric_protobuf::{CompactMessage, KeyValueMessage};

/// A fully decoded telemetry message, ready for output.
#[derive(Debug)]
pub enum DecodedMessage {
    Json(serde_json::Value),
    Compact(CompactMessage),
    KeyValue(KeyValueMessage),
}

impl DecodedMessage {
    pub fn msg_type(&self) -> MsgType {
        match self {
            DecodedMessage::Json(_) => MsgType::Json,
            DecodedMessage::Compact(_) => MsgType::GpbCompact,
            DecodedMessage::KeyValue(_) => MsgType::GpbKeyValue,
        }
    }
}

/// Destination for decoded messages.
///
/// One sink is shared by every TCP session and the UDP loop, so
/// implementations must tolerate concurrent calls.
pub trait MessageSink: Send + Sync {
    fn emit(&self, message: DecodedMessage);
}

impl<F> MessageSink for F
where
    F: Fn(DecodedMessage) + Send + Sync,
{
    fn emit(&self, message: DecodedMessage) {
        self(message)
    }
}
