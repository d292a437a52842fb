//! Baseline schemas that every registry carries: the well-known descriptor
//! types, the `schema_path` option and the compact / key-value headers.
//!
//! The header descriptors are built in memory so decoding never depends on
//! the external compiler. The same definitions ship as `.proto` text for
//! caller schemas that import them.

use prost_reflect::{DescriptorError, DescriptorPool};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, OneofDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

/// Fully-qualified name of the compact GPB header message.
pub const COMPACT_HEADER_MESSAGE: &str = "telemetry.TelemetryHeader";

/// Fully-qualified name of the key-value GPB header message.
pub const KEY_VALUE_HEADER_MESSAGE: &str = "telemetry_kv.Telemetry";

const DESCRIPTOR_PROTO: &str = "google/protobuf/descriptor.proto";

/// `.proto` sources of the baseline files, written into the compiler's
/// include path.
pub(crate) const BASELINE_SOURCES: [(&str, &str); 3] = [
    ("cisco.proto", include_str!("../proto/cisco.proto")),
    ("telemetry.proto", include_str!("../proto/telemetry.proto")),
    ("telemetry_kv.proto", include_str!("../proto/telemetry_kv.proto")),
];

/// Build a descriptor pool holding the four baseline files.
///
/// Starts from the global pool, which already carries
/// `google/protobuf/descriptor.proto`.
pub(crate) fn baseline_pool() -> Result<DescriptorPool, DescriptorError> {
    let mut pool = DescriptorPool::global();
    for file in [cisco_file(), telemetry_file(), telemetry_kv_file()] {
        if pool.get_file_by_name(file.name()).is_none() {
            pool.add_file_descriptor_proto(file)?;
        }
    }
    Ok(pool)
}

fn cisco_file() -> FileDescriptorProto {
    let mut schema_path = field("schema_path", 50000, Type::String, Label::Optional);
    schema_path.extendee = Some(".google.protobuf.MessageOptions".to_string());
    FileDescriptorProto {
        name: Some("cisco.proto".to_string()),
        package: Some("cisco".to_string()),
        dependency: vec![DESCRIPTOR_PROTO.to_string()],
        extension: vec![schema_path],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn telemetry_file() -> FileDescriptorProto {
    let header = message(
        "TelemetryHeader",
        vec![
            field("encoding", 1, Type::Fixed32, Label::Optional),
            field("policy_name", 2, Type::String, Label::Optional),
            field("version", 3, Type::String, Label::Optional),
            field("identifier", 4, Type::String, Label::Optional),
            field("start_time", 5, Type::Uint64, Label::Optional),
            field("end_time", 6, Type::Uint64, Label::Optional),
            message_field("tables", 7, ".telemetry.TelemetryTable", Label::Repeated),
        ],
    );
    let table = message(
        "TelemetryTable",
        vec![
            field("policy_path", 1, Type::String, Label::Optional),
            field("row", 2, Type::Bytes, Label::Repeated),
        ],
    );
    FileDescriptorProto {
        name: Some("telemetry.proto".to_string()),
        package: Some("telemetry".to_string()),
        message_type: vec![header, table],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn telemetry_kv_file() -> FileDescriptorProto {
    let header = message(
        "Telemetry",
        vec![
            field("collection_id", 1, Type::Uint64, Label::Optional),
            field("base_path", 2, Type::String, Label::Optional),
            field("subscription_identifier", 3, Type::String, Label::Optional),
            field("model_version", 4, Type::String, Label::Optional),
            field("collection_start_time", 5, Type::Uint64, Label::Optional),
            field("msg_timestamp", 6, Type::Uint64, Label::Optional),
            message_field("fields", 14, ".telemetry_kv.TelemetryField", Label::Repeated),
            field("collection_end_time", 15, Type::Uint64, Label::Optional),
        ],
    );

    let value_by_type = [
        ("bytes_value", 4, Type::Bytes),
        ("string_value", 5, Type::String),
        ("bool_value", 6, Type::Bool),
        ("uint32_value", 7, Type::Uint32),
        ("uint64_value", 8, Type::Uint64),
        ("sint32_value", 9, Type::Sint32),
        ("sint64_value", 10, Type::Sint64),
        ("double_value", 11, Type::Double),
        ("float_value", 12, Type::Float),
    ];
    let mut fields = vec![
        field("timestamp", 1, Type::Uint64, Label::Optional),
        field("name", 2, Type::String, Label::Optional),
        field("augment_data", 3, Type::Bool, Label::Optional),
    ];
    fields.extend(value_by_type.iter().map(|&(name, number, typ)| {
        let mut f = field(name, number, typ, Label::Optional);
        f.oneof_index = Some(0);
        f
    }));
    fields.push(message_field(
        "fields",
        15,
        ".telemetry_kv.TelemetryField",
        Label::Repeated,
    ));
    let mut telemetry_field = message("TelemetryField", fields);
    telemetry_field.oneof_decl = vec![OneofDescriptorProto {
        name: Some("value_by_type".to_string()),
        ..Default::default()
    }];

    FileDescriptorProto {
        name: Some("telemetry_kv.proto".to_string()),
        package: Some("telemetry_kv".to_string()),
        message_type: vec![header, telemetry_field],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, typ: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(typ.into()),
        label: Some(label.into()),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..field(name, number, Type::Message, label)
    }
}
