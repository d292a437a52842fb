//! Convert a protobuf `DynamicMessage` into the schema-independent [`Value`].

use std::sync::Arc;

use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage,
    Value as ProtoValue,
};
use telemetric_core::{DecodeError, Value};

/// Decode `bytes` as an instance of the message described by `desc`.
pub(crate) fn decode_message(
    desc: &MessageDescriptor,
    bytes: &[u8],
) -> Result<DynamicMessage, DecodeError> {
    DynamicMessage::decode(desc.clone(), bytes).map_err(|e| DecodeError::MessageDecode {
        message_name: desc.full_name().to_string(),
        source: Box::new(e),
    })
}

/// Project every populated field of `msg` into a [`Value::Map`].
///
/// Extension fields are skipped. Repeated fields become lists in wire order,
/// map fields become maps keyed by the stringified key in sorted order, bytes
/// become colon-separated hex and enums their ordinal.
pub fn message_to_value(msg: &DynamicMessage) -> Result<Value, DecodeError> {
    let mut entries = Vec::new();
    for (field, value) in msg.fields() {
        let kind = field.kind();
        let value = field_value_to_value(&field, &kind, value)?;
        entries.push((Arc::from(field.name()), value));
    }
    Ok(Value::Map(entries))
}

fn field_value_to_value(
    field: &FieldDescriptor,
    kind: &Kind,
    value: &ProtoValue,
) -> Result<Value, DecodeError> {
    let converted = match (value, kind) {
        (ProtoValue::Bool(v), Kind::Bool) => Value::Bool(*v),
        (ProtoValue::I32(v), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32) => {
            Value::Int(i64::from(*v))
        }
        (ProtoValue::I64(v), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64) => Value::Int(*v),
        (ProtoValue::U32(v), Kind::Uint32 | Kind::Fixed32) => Value::UInt(u64::from(*v)),
        (ProtoValue::U64(v), Kind::Uint64 | Kind::Fixed64) => Value::UInt(*v),
        (ProtoValue::F32(v), Kind::Float) => Value::Float(f64::from(*v)),
        (ProtoValue::F64(v), Kind::Double) => Value::Float(*v),
        (ProtoValue::String(s), Kind::String) => Value::string(s),
        (ProtoValue::Bytes(b), Kind::Bytes) => Value::bytes(b),
        (ProtoValue::EnumNumber(n), Kind::Enum(_)) => Value::Int(i64::from(*n)),
        (ProtoValue::Message(m), Kind::Message(_)) => message_to_value(m)?,
        (ProtoValue::List(items), _) if field.is_list() => Value::List(
            items
                .iter()
                .map(|item| field_value_to_value(field, kind, item))
                .collect::<Result<_, _>>()?,
        ),
        (ProtoValue::Map(map), Kind::Message(entry)) if field.is_map() => {
            let value_kind = entry.map_entry_value_field().kind();
            let mut entries = map
                .iter()
                .map(|(k, v)| {
                    let v = field_value_to_value(field, &value_kind, v)?;
                    Ok((map_key_to_string(k), v))
                })
                .collect::<Result<Vec<_>, DecodeError>>()?;
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::map(entries)
        }
        (other, kind) => return Err(unrecognised(field, other, kind)),
    };
    Ok(converted)
}

pub(crate) fn map_key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Bool(v) => v.to_string(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::String(s) => s.clone(),
    }
}

fn unrecognised(field: &FieldDescriptor, value: &ProtoValue, kind: &Kind) -> DecodeError {
    DecodeError::UnrecognisedFieldType {
        message_name: field.parent_message().full_name().to_string(),
        field: field.name().to_string(),
        detail: format!("value {value:?} does not match declared kind {kind:?}"),
    }
}

/// Read a header field through `get`, which extracts an owned value.
///
/// A missing field or a value of the wrong kind is reported against the
/// message's descriptor.
pub(crate) fn header_field<T>(
    msg: &DynamicMessage,
    name: &str,
    get: impl FnOnce(&ProtoValue) -> Option<T>,
) -> Result<T, DecodeError> {
    let desc = msg.descriptor();
    let Some(value) = msg.get_field_by_name(name) else {
        return Err(DecodeError::MissingHeaderField {
            message_name: desc.full_name().to_string(),
            field: name.to_string(),
        });
    };
    get(&*value).ok_or_else(|| DecodeError::UnrecognisedFieldType {
        message_name: desc.full_name().to_string(),
        field: name.to_string(),
        detail: format!("unexpected value {value:?}"),
    })
}

/// Read a repeated sub-message header field.
pub(crate) fn header_messages(
    msg: &DynamicMessage,
    name: &str,
) -> Result<Vec<DynamicMessage>, DecodeError> {
    header_field(msg, name, |v| {
        v.as_list()?
            .iter()
            .map(|item| item.as_message().cloned())
            .collect()
    })
}
