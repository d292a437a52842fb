use std::sync::Arc;

use bytes::Bytes;
use telemetric_core::MsgType;
use telemetric_protobuf::{DecodeOptions, SchemaRegistry, decode_compact, decode_key_value};
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

use crate::{
    compression::CompressionContext,
    error::SessionError,
    frame::{self, DEFAULT_MAX_MESSAGE_LEN, ProtocolVersion, TelemetryFrame},
    sink::{DecodedMessage, MessageSink},
    v1::{self, Tlv},
    v2,
};

/// Outcome of reading one message from a session.
#[derive(Debug)]
pub enum SessionEvent {
    Message(DecodedMessage),
    /// A message that only reset the decompressor.
    Reset,
    /// The peer closed the connection between messages.
    Closed,
}

/// One TCP connection: a byte stream plus the decompression state that
/// persists across its messages.
pub struct Session<R> {
    reader: R,
    context: CompressionContext,
    registry: Arc<SchemaRegistry>,
    sink: Arc<dyn MessageSink>,
    options: DecodeOptions,
    max_message_len: usize,
}

impl<R> Session<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, registry: Arc<SchemaRegistry>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            reader,
            context: CompressionContext::new(),
            registry,
            sink,
            options: DecodeOptions::default(),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    /// Read and emit messages until the peer disconnects or a fatal error.
    ///
    /// Non-fatal errors lose only the message they occurred in and are
    /// logged.
    pub async fn run(mut self) -> Result<(), SessionError> {
        loop {
            match self.next_message().await {
                Ok(SessionEvent::Message(message)) => self.sink.emit(message),
                Ok(SessionEvent::Reset) => {}
                Ok(SessionEvent::Closed) => {
                    info!("connection closed");
                    return Ok(());
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "ending session");
                    return Err(err);
                }
                Err(err) => warn!(error = %err, "skipping message"),
            }
        }
    }

    /// Read one whole message, whichever protocol generation it uses.
    ///
    /// After a non-fatal error the stream is positioned at the start of the
    /// next message.
    pub async fn next_message(&mut self) -> Result<SessionEvent, SessionError> {
        let Some(word) = frame::read_header_word(&mut self.reader).await? else {
            return Ok(SessionEvent::Closed);
        };
        match ProtocolVersion::detect(word) {
            ProtocolVersion::V1 { envelope_len } => self.read_v1(envelope_len).await,
            ProtocolVersion::V2 { msg_type } => self.read_v2(msg_type).await,
        }
    }

    async fn read_v1(&mut self, envelope_len: u32) -> Result<SessionEvent, SessionError> {
        info!(length = envelope_len, "received v1 message (compressed JSON)");
        let envelope = frame::read_body(&mut self.reader, envelope_len, self.max_message_len).await?;

        let mut document = Vec::new();
        let mut chunks = 0;
        for tlv in v1::parse_envelope(envelope)? {
            match tlv {
                Tlv::Reset => {
                    debug!("reset compressor TLV");
                    self.context = CompressionContext::new();
                }
                Tlv::Chunk(chunk) => {
                    debug!(length = chunk.len(), "message TLV");
                    document.extend_from_slice(&self.context.inflate(&chunk)?);
                    chunks += 1;
                }
            }
        }

        if chunks == 0 {
            return Ok(SessionEvent::Reset);
        }
        let message = decode_payload(&self.registry, MsgType::Json, &document, self.options)?;
        Ok(message.map_or(SessionEvent::Reset, SessionEvent::Message))
    }

    async fn read_v2(&mut self, msg_type: u32) -> Result<SessionEvent, SessionError> {
        let header = v2::read_header(&mut self.reader, msg_type).await?;
        let payload = frame::read_body(&mut self.reader, header.length, self.max_message_len).await?;
        // The sender's compressor has consumed every flagged payload, so it
        // must pass through the context whatever its type turns out to be.
        let inflated = header
            .flags
            .is_compressed()
            .then(|| self.context.inflate(&payload));
        let msg_type = MsgType::try_from(header.msg_type)?;
        info!(
            msg_type = %msg_type,
            flags = %header.flags,
            length = header.length,
            "received v2 message"
        );

        if msg_type == MsgType::ResetCompressor {
            self.context = CompressionContext::new();
            return Ok(SessionEvent::Reset);
        }

        let payload = match inflated {
            Some(result) => Bytes::from(result?),
            None => payload,
        };
        let frame = TelemetryFrame {
            msg_type,
            flags: header.flags,
            payload,
        };
        let message = decode_payload(&self.registry, frame.msg_type, &frame.payload, self.options)?;
        Ok(message.map_or(SessionEvent::Reset, SessionEvent::Message))
    }
}

/// Route a complete, decompressed payload to the decoder for its type.
///
/// Reset messages carry nothing to decode and yield `None`.
pub fn decode_payload(
    registry: &SchemaRegistry,
    msg_type: MsgType,
    payload: &[u8],
    options: DecodeOptions,
) -> Result<Option<DecodedMessage>, SessionError> {
    let message = match msg_type {
        MsgType::ResetCompressor => return Ok(None),
        MsgType::Json => DecodedMessage::Json(serde_json::from_slice(payload)?),
        MsgType::GpbCompact => {
            DecodedMessage::Compact(decode_compact(registry, payload, options)?)
        }
        MsgType::GpbKeyValue => {
            DecodedMessage::KeyValue(decode_key_value(registry, payload, options)?)
        }
    };
    Ok(Some(message))
}
