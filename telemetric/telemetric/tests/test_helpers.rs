//! Shared helpers for building wire messages and running sessions in tests.
#![allow(dead_code)]

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use flate2::{Compression, write::ZlibEncoder};
use prost::Message;
use prost_reflect::{DynamicMessage, Value as ProtoValue};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    field_descriptor_proto::{Label, Type},
};
use telemetric::{DecodedMessage, MessageSink, Session, SessionError};
use telemetric_protobuf::{COMPACT_ENCODING, DecodeOptions, SchemaRegistry};

pub const ROW_PATH: &str = "RootOper.Demo.Row";

fn field(name: &str, number: i32, typ: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(typ.into()),
        label: Some(Label::Optional.into()),
        ..Default::default()
    }
}

/// `demo.Row { string name = 1; uint64 packets = 2; }` registered under
/// [`ROW_PATH`].
pub fn row_registry() -> Arc<SchemaRegistry> {
    let fds = FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("demo/row.proto".to_string()),
            package: Some("demo".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Row".to_string()),
                field: vec![
                    field("name", 1, Type::String),
                    field("packets", 2, Type::Uint64),
                ],
                ..Default::default()
            }],
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }],
    };
    let registry = SchemaRegistry::builder()
        .unwrap()
        .add_file_descriptor_set(&fds.encode_to_vec())
        .unwrap()
        .register(ROW_PATH, "demo.Row")
        .build()
        .unwrap();
    Arc::new(registry)
}

/// Compact GPB message with one table holding one `demo.Row`.
pub fn compact_payload(registry: &SchemaRegistry, name: &str, packets: u64) -> Vec<u8> {
    compact_payload_with_encoding(registry, COMPACT_ENCODING, name, packets)
}

pub fn compact_payload_with_encoding(
    registry: &SchemaRegistry,
    encoding: u32,
    name: &str,
    packets: u64,
) -> Vec<u8> {
    let pool = registry.pool();
    let mut row = DynamicMessage::new(pool.get_message_by_name("demo.Row").unwrap());
    row.set_field_by_name("name", ProtoValue::String(name.to_string()));
    row.set_field_by_name("packets", ProtoValue::U64(packets));

    let mut table =
        DynamicMessage::new(pool.get_message_by_name("telemetry.TelemetryTable").unwrap());
    table.set_field_by_name("policy_path", ProtoValue::String(ROW_PATH.to_string()));
    table.set_field_by_name(
        "row",
        ProtoValue::List(vec![ProtoValue::Bytes(row.encode_to_vec().into())]),
    );

    let mut header = DynamicMessage::new(registry.compact_header().clone());
    header.set_field_by_name("encoding", ProtoValue::U32(encoding));
    header.set_field_by_name("policy_name", ProtoValue::String("demo".to_string()));
    header.set_field_by_name("tables", ProtoValue::List(vec![ProtoValue::Message(table)]));
    header.encode_to_vec()
}

/// Key-value GPB message with a single top-level uint32 field.
pub fn kv_payload(registry: &SchemaRegistry, name: &str, value: u32) -> Vec<u8> {
    let pool = registry.pool();
    let mut field =
        DynamicMessage::new(pool.get_message_by_name("telemetry_kv.TelemetryField").unwrap());
    field.set_field_by_name("name", ProtoValue::String(name.to_string()));
    field.set_field_by_name("uint32_value", ProtoValue::U32(value));

    let mut header = DynamicMessage::new(registry.key_value_header().clone());
    header.set_field_by_name("collection_id", ProtoValue::U64(1));
    header.set_field_by_name("base_path", ProtoValue::String("demo:path".to_string()));
    header.set_field_by_name("fields", ProtoValue::List(vec![ProtoValue::Message(field)]));
    header.encode_to_vec()
}

/// A zlib compressor that sync-flushes after every chunk, as senders do.
pub struct SyncCompressor {
    encoder: ZlibEncoder<Vec<u8>>,
}

impl SyncCompressor {
    pub fn new() -> Self {
        Self {
            encoder: ZlibEncoder::new(Vec::new(), Compression::default()),
        }
    }

    pub fn chunk(&mut self, data: &[u8]) -> Vec<u8> {
        self.encoder.write_all(data).unwrap();
        self.encoder.flush().unwrap();
        std::mem::take(self.encoder.get_mut())
    }
}

/// Encode a v2 frame: `msg_type`, `flags`, `length`, payload.
pub fn v2_frame(msg_type: u32, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(12 + payload.len());
    frame.extend_from_slice(&msg_type.to_be_bytes());
    frame.extend_from_slice(&flags.to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

pub enum TestTlv<'a> {
    Reset,
    Chunk(&'a [u8]),
}

/// Encode a v1 envelope: total length, then the TLVs.
pub fn v1_envelope(tlvs: &[TestTlv<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for tlv in tlvs {
        match tlv {
            TestTlv::Reset => {
                body.extend_from_slice(&1u32.to_be_bytes());
                body.extend_from_slice(&4u32.to_be_bytes());
            }
            TestTlv::Chunk(chunk) => {
                body.extend_from_slice(&2u32.to_be_bytes());
                body.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
                body.extend_from_slice(chunk);
            }
        }
    }
    let mut envelope = (body.len() as u32).to_be_bytes().to_vec();
    envelope.extend(body);
    envelope
}

/// Sink that records every message it receives.
pub fn collecting_sink() -> (Arc<dyn MessageSink>, Arc<Mutex<Vec<DecodedMessage>>>) {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let store = Arc::clone(&collected);
    let sink = move |message: DecodedMessage| store.lock().unwrap().push(message);
    (Arc::new(sink), collected)
}

/// Run a session over `input` to completion.
pub async fn run_session(
    registry: Arc<SchemaRegistry>,
    input: &[u8],
    max_message_len: Option<usize>,
) -> (Result<(), SessionError>, Vec<DecodedMessage>) {
    let (sink, collected) = collecting_sink();
    let mut session = Session::new(input, registry, sink).with_options(DecodeOptions::all());
    if let Some(limit) = max_message_len {
        session = session.with_max_message_len(limit);
    }
    let result = session.run().await;
    let messages = std::mem::take(&mut *collected.lock().unwrap());
    (result, messages)
}

pub fn json_value(message: &DecodedMessage) -> &serde_json::Value {
    match message {
        DecodedMessage::Json(value) => value,
        other => panic!("expected a JSON message, got {:?}", other.msg_type()),
    }
}
