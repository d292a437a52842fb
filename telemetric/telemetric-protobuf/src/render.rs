//! Indented text rendering shared by the compact and key-value decoders.

use std::fmt;

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, ReflectMessage, Value as ProtoValue};
use telemetric_core::format_bytes;

use crate::project::map_key_to_string;

const INDENT: &str = "  ";

/// Write one line prefixed by `indent` levels of indentation.
pub(crate) fn write_line(
    out: &mut impl fmt::Write,
    indent: usize,
    args: fmt::Arguments<'_>,
) -> fmt::Result {
    for _ in 0..indent {
        out.write_str(INDENT)?;
    }
    out.write_fmt(args)?;
    out.write_char('\n')
}

macro_rules! indented {
    ($out:expr, $indent:expr, $($arg:tt)*) => {
        $crate::render::write_line($out, $indent, format_args!($($arg)*))
    };
}
pub(crate) use indented;

/// Write every field declared by the message's schema, unset ones included.
///
/// Sub-messages open a `name {` block one level deeper; repeated
/// sub-messages are wrapped in `name (<n> items) [ ... ]`. With `brief` only
/// the first item of each repeated sub-message is shown.
pub(crate) fn write_message(
    out: &mut impl fmt::Write,
    msg: &DynamicMessage,
    indent: usize,
    brief: bool,
) -> fmt::Result {
    for field in msg.descriptor().fields() {
        let value = msg.get_field(&field);
        match (field.kind(), &*value) {
            (Kind::Message(_), ProtoValue::List(items)) => {
                indented!(out, indent, "{} ({} items) [", field.name(), items.len())?;
                let shown = if brief { items.len().min(1) } else { items.len() };
                for (i, item) in items.iter().take(shown).enumerate() {
                    indented!(out, indent, "{} {} {{", field.name(), i)?;
                    if let ProtoValue::Message(item) = item {
                        write_message(out, item, indent + 1, brief)?;
                    }
                    indented!(out, indent, "}}")?;
                }
                indented!(out, indent, "]")?;
            }
            (_, ProtoValue::Map(map)) => {
                indented!(out, indent, "{} {{", field.name())?;
                let value_field = map_value_field(&field);
                let mut entries: Vec<(String, String)> = map
                    .iter()
                    .map(|(k, v)| (map_key_to_string(k), scalar(&value_field, v)))
                    .collect();
                entries.sort();
                for (key, value) in entries {
                    indented!(out, indent + 1, "{key}: {value}")?;
                }
                indented!(out, indent, "}}")?;
            }
            (Kind::Message(_), ProtoValue::Message(sub)) => {
                indented!(out, indent, "{} {{", field.name())?;
                // Unset sub-messages are shown empty rather than expanded,
                // which keeps recursive schemas finite.
                if msg.has_field(&field) {
                    write_message(out, sub, indent + 1, brief)?;
                }
                indented!(out, indent, "}}")?;
            }
            (_, value) => {
                indented!(out, indent, "{}: {}", field.name(), scalar(&field, value))?;
            }
        }
    }
    Ok(())
}

fn map_value_field(field: &FieldDescriptor) -> FieldDescriptor {
    match field.kind() {
        Kind::Message(entry) if entry.is_map_entry() => entry.map_entry_value_field(),
        _ => field.clone(),
    }
}

/// Text for a scalar (or repeated scalar) field value.
fn scalar(field: &FieldDescriptor, value: &ProtoValue) -> String {
    match value {
        ProtoValue::Bool(v) => v.to_string(),
        ProtoValue::I32(v) => v.to_string(),
        ProtoValue::I64(v) => v.to_string(),
        ProtoValue::U32(v) => v.to_string(),
        ProtoValue::U64(v) => v.to_string(),
        ProtoValue::F32(v) => v.to_string(),
        ProtoValue::F64(v) => v.to_string(),
        ProtoValue::String(s) => s.clone(),
        ProtoValue::Bytes(b) => format_bytes(b),
        ProtoValue::EnumNumber(n) => match field.kind() {
            Kind::Enum(desc) => desc
                .get_value(*n)
                .map(|v| v.name().to_string())
                .unwrap_or_else(|| n.to_string()),
            _ => n.to_string(),
        },
        ProtoValue::List(items) => {
            let items: Vec<String> = items.iter().map(|item| scalar(field, item)).collect();
            format!("[{}]", items.join(", "))
        }
        ProtoValue::Message(_) | ProtoValue::Map(_) => String::from("{...}"),
    }
}
