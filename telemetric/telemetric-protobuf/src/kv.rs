//! Decoder for the self-describing key-value GPB encoding.

use std::fmt;

use bytes::Bytes;
use prost_reflect::{DynamicMessage, Value as ProtoValue};
use telemetric_core::{DecodeError, Value, format_bytes, format_timestamp};

use crate::{
    options::DecodeOptions,
    project::{decode_message, header_field, header_messages, message_to_value},
    registry::SchemaRegistry,
    render::indented,
};

/// Deepest field nesting accepted before the tree is rejected.
///
/// Kept below the protobuf decoder's own recursion limit of 100 so an
/// overly deep tree is reported as [`DecodeError::DepthExceeded`].
pub const MAX_FIELD_DEPTH: usize = 64;

/// Key used for fields that carry no name.
pub const NO_NAME: &str = "<no name>";

/// The single scalar a [`KeyValueField`] may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bytes(Bytes),
    String(String),
    Bool(bool),
    Uint32(u32),
    Uint64(u64),
    Sint32(i32),
    Sint64(i64),
    Double(f64),
    Float(f32),
}

impl ScalarValue {
    /// Oneof member names, in probing order.
    const FIELDS: [&'static str; 9] = [
        "bytes_value",
        "string_value",
        "bool_value",
        "uint32_value",
        "uint64_value",
        "sint32_value",
        "sint64_value",
        "double_value",
        "float_value",
    ];

    /// Type label used in the text rendering, e.g. `uint32`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Uint32(_) => "uint32",
            Self::Uint64(_) => "uint64",
            Self::Sint32(_) => "sint32",
            Self::Sint64(_) => "sint64",
            Self::Double(_) => "double",
            Self::Float(_) => "float",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Bytes(b) => Value::bytes(b),
            Self::String(s) => Value::string(s),
            Self::Bool(v) => Value::Bool(*v),
            Self::Uint32(v) => Value::UInt(u64::from(*v)),
            Self::Uint64(v) => Value::UInt(*v),
            Self::Sint32(v) => Value::Int(i64::from(*v)),
            Self::Sint64(v) => Value::Int(*v),
            Self::Double(v) => Value::Float(*v),
            Self::Float(v) => Value::Float(f64::from(*v)),
        }
    }

    fn from_proto(field: &str, value: &ProtoValue) -> Option<Self> {
        let scalar = match (field, value) {
            ("bytes_value", ProtoValue::Bytes(b)) => Self::Bytes(b.clone()),
            ("string_value", ProtoValue::String(s)) => Self::String(s.clone()),
            ("bool_value", ProtoValue::Bool(v)) => Self::Bool(*v),
            ("uint32_value", ProtoValue::U32(v)) => Self::Uint32(*v),
            ("uint64_value", ProtoValue::U64(v)) => Self::Uint64(*v),
            ("sint32_value", ProtoValue::I32(v)) => Self::Sint32(*v),
            ("sint64_value", ProtoValue::I64(v)) => Self::Sint64(*v),
            ("double_value", ProtoValue::F64(v)) => Self::Double(*v),
            ("float_value", ProtoValue::F32(v)) => Self::Float(*v),
            _ => return None,
        };
        Some(scalar)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.write_str(&format_bytes(b)),
            Self::String(s) => f.write_str(s),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Sint32(v) => write!(f, "{v}"),
            Self::Sint64(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// One node of the key-value field tree. The tree owns its subtrees.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyValueField {
    pub name: Option<String>,
    /// Millisecond timestamp; a wire value of zero is `None`.
    pub timestamp: Option<u64>,
    pub value: Option<ScalarValue>,
    pub children: Vec<KeyValueField>,
}

impl KeyValueField {
    /// Field name, or `"<no name>"`.
    pub fn key(&self) -> &str {
        self.name.as_deref().unwrap_or(NO_NAME)
    }

    /// Keyed projection of this node.
    ///
    /// A leaf becomes its scalar, a structural node the map of its children,
    /// and a node with both `{"value": scalar, "fields": children}`.
    pub fn to_value(&self) -> Value {
        match (&self.value, self.children.is_empty()) {
            (Some(scalar), true) => scalar.to_value(),
            (None, true) => Value::Null,
            (None, false) => children_value(&self.children),
            (Some(scalar), false) => Value::map([
                ("value", scalar.to_value()),
                ("fields", children_value(&self.children)),
            ]),
        }
    }

    fn from_message(msg: &DynamicMessage, depth: usize) -> Result<Self, DecodeError> {
        if depth > MAX_FIELD_DEPTH {
            return Err(DecodeError::DepthExceeded {
                limit: MAX_FIELD_DEPTH,
            });
        }

        let name = header_field(msg, "name", |v| v.as_str().map(str::to_string))?;
        let timestamp = header_field(msg, "timestamp", |v| v.as_u64())?;
        let children = header_messages(msg, "fields")?
            .iter()
            .map(|child| Self::from_message(child, depth + 1))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            name: (!name.is_empty()).then_some(name),
            timestamp: (timestamp != 0).then_some(timestamp),
            value: scalar_value(msg)?,
            children,
        })
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let time = match self.timestamp {
            Some(ms) => format_timestamp(ms),
            None => "0".to_string(),
        };
        if let Some(value) = &self.value {
            indented!(f, indent, "{}: {value} ({}) {time}", self.key(), value.type_name())?;
        }
        if !self.children.is_empty() {
            indented!(
                f,
                indent,
                "{}: fields (items {}) {time} {{",
                self.key(),
                self.children.len()
            )?;
            for child in &self.children {
                child.write(f, indent + 1)?;
            }
            indented!(f, indent, "}}")?;
        }
        Ok(())
    }
}

fn scalar_value(msg: &DynamicMessage) -> Result<Option<ScalarValue>, DecodeError> {
    let Some(name) = ScalarValue::FIELDS
        .into_iter()
        .find(|name| msg.has_field_by_name(name))
    else {
        return Ok(None);
    };
    header_field(msg, name, |v| ScalarValue::from_proto(name, v)).map(Some)
}

fn children_value(children: &[KeyValueField]) -> Value {
    Value::map(children.iter().map(|child| (child.key(), child.to_value())))
}

/// Typed view of `telemetry_kv.Telemetry`.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueHeader {
    pub collection_id: u64,
    pub base_path: String,
    pub subscription_identifier: String,
    pub model_version: String,
    pub collection_start_time: Option<u64>,
    pub collection_end_time: Option<u64>,
    pub msg_timestamp: u64,
    pub fields: Vec<KeyValueField>,
}

/// A decoded key-value message.
#[derive(Debug, Clone)]
pub struct KeyValueMessage {
    pub header: KeyValueHeader,
    header_message: DynamicMessage,
    options: DecodeOptions,
}

/// Decode a key-value GPB message into an owned field tree.
///
/// Trees nested deeper than [`MAX_FIELD_DEPTH`] are rejected.
pub fn decode_key_value(
    registry: &SchemaRegistry,
    bytes: &[u8],
    options: DecodeOptions,
) -> Result<KeyValueMessage, DecodeError> {
    let msg = decode_message(registry.key_value_header(), bytes)?;
    let string = |v: &ProtoValue| v.as_str().map(str::to_string);
    let number = |name: &str| header_field(&msg, name, |v| v.as_u64());
    let optional_time = |t: u64| (t != 0).then_some(t);

    let header = KeyValueHeader {
        collection_id: number("collection_id")?,
        base_path: header_field(&msg, "base_path", string)?,
        subscription_identifier: header_field(&msg, "subscription_identifier", string)?,
        model_version: header_field(&msg, "model_version", string)?,
        collection_start_time: optional_time(number("collection_start_time")?),
        collection_end_time: optional_time(number("collection_end_time")?),
        msg_timestamp: number("msg_timestamp")?,
        fields: header_messages(&msg, "fields")?
            .iter()
            .map(|field| KeyValueField::from_message(field, 1))
            .collect::<Result<_, _>>()?,
    };

    Ok(KeyValueMessage {
        header,
        header_message: msg,
        options,
    })
}

impl KeyValueMessage {
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Raw header message as decoded from the wire.
    pub fn header_message(&self) -> &DynamicMessage {
        &self.header_message
    }

    /// Top-level fields honouring the brief option.
    pub fn shown_fields(&self) -> &[KeyValueField] {
        let fields = &self.header.fields;
        &fields[..self.options.limit(fields.len())]
    }

    /// Generic projection of the whole message; in brief mode `fields` is
    /// cut down to its first entry.
    pub fn to_value(&self) -> Result<Value, DecodeError> {
        let mut value = message_to_value(&self.header_message)?;
        if let Some(Value::List(fields)) = value.get_mut("fields") {
            fields.truncate(self.options.limit(fields.len()));
        }
        Ok(value)
    }

    /// Keyed projection of the field tree.
    pub fn fields_value(&self) -> Value {
        children_value(self.shown_fields())
    }

    /// Indented text rendering.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for KeyValueMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(f, "Collection ID:   {}", header.collection_id)?;
        writeln!(f, "Base Path:       {}", header.base_path)?;
        writeln!(f, "Subscription ID: {}", header.subscription_identifier)?;
        writeln!(f, "Model Version:   {}", header.model_version)?;
        if let Some(start) = header.collection_start_time {
            writeln!(f, "Start Time:      {}", format_timestamp(start))?;
        }
        writeln!(f, "Msg Timestamp:   {}", format_timestamp(header.msg_timestamp))?;
        if let Some(end) = header.collection_end_time {
            writeln!(f, "End Time:        {}", format_timestamp(end))?;
        }
        writeln!(f, "Fields: {}", header.fields.len())?;

        if self.options.brief {
            if let Some(first) = header.fields.first() {
                indented!(f, 1, "Displaying first entry only")?;
                first.write(f, 1)?;
            }
        } else {
            for field in &header.fields {
                field.write(f, 2)?;
            }
        }
        Ok(())
    }
}
