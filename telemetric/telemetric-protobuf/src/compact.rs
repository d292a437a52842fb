//! Decoder for the table-oriented compact GPB encoding.

use std::fmt;

use bytes::Bytes;
use prost_reflect::{DynamicMessage, ReflectMessage};
use telemetric_core::{DecodeError, Value, format_timestamp};
use tracing::warn;

use crate::{
    options::DecodeOptions,
    project::{decode_message, header_field, header_messages, message_to_value},
    registry::SchemaRegistry,
    render::{indented, write_message},
};

/// Magic value every compact header carries in its `encoding` field.
pub const COMPACT_ENCODING: u32 = 0x8765_4321;

/// Placeholder emitted in place of rows whose schema path is not registered.
pub const NO_DECODER_PLACEHOLDER: &str = "<No decoder available>";

/// Typed view of `telemetry.TelemetryHeader`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactHeader {
    pub encoding: u32,
    pub policy_name: String,
    pub version: String,
    pub identifier: String,
    pub start_time: u64,
    pub end_time: u64,
    pub tables: Vec<TableEntry>,
}

/// One `telemetry.TelemetryTable`: raw rows sharing a schema path.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub policy_path: String,
    pub rows: Vec<Bytes>,
}

/// A row decoded with the schema registered for its table.
#[derive(Debug, Clone)]
pub struct DecodedRow {
    /// Position of the row within its table.
    pub index: usize,
    pub message: DynamicMessage,
}

/// Outcome of decoding the rows of one table.
#[derive(Debug, Clone)]
pub enum DecodedRows {
    /// No schema is registered for the table's path.
    NoDecoder,
    /// Rows that decoded, plus the number that failed and were skipped.
    Decoded { rows: Vec<DecodedRow>, failed: usize },
}

#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub policy_path: String,
    /// Row count announced by the header, whether or not all were decoded.
    pub row_count: usize,
    pub rows: DecodedRows,
}

/// A decoded compact message: header plus per-table rows.
#[derive(Debug, Clone)]
pub struct CompactMessage {
    pub header: CompactHeader,
    pub tables: Vec<DecodedTable>,
    header_message: DynamicMessage,
    options: DecodeOptions,
}

/// Decode a compact GPB message.
///
/// The `encoding` magic is checked before any table is examined. Tables with
/// an unregistered schema path yield [`DecodedRows::NoDecoder`]; rows that
/// fail to decode are logged and skipped. With `options.brief` only the
/// first row of each table is decoded.
pub fn decode_compact(
    registry: &SchemaRegistry,
    bytes: &[u8],
    options: DecodeOptions,
) -> Result<CompactMessage, DecodeError> {
    let header_message = decode_message(registry.compact_header(), bytes)?;

    let encoding = header_field(&header_message, "encoding", |v| v.as_u32())?;
    if encoding != COMPACT_ENCODING {
        return Err(DecodeError::EncodingMismatch {
            found: encoding,
            expected: COMPACT_ENCODING,
        });
    }

    let header = CompactHeader {
        encoding,
        policy_name: header_field(&header_message, "policy_name", string)?,
        version: header_field(&header_message, "version", string)?,
        identifier: header_field(&header_message, "identifier", string)?,
        start_time: header_field(&header_message, "start_time", |v| v.as_u64())?,
        end_time: header_field(&header_message, "end_time", |v| v.as_u64())?,
        tables: header_messages(&header_message, "tables")?
            .iter()
            .map(table_entry)
            .collect::<Result<_, _>>()?,
    };

    let tables = header
        .tables
        .iter()
        .map(|table| decode_table(registry, table, options))
        .collect();

    Ok(CompactMessage {
        header,
        tables,
        header_message,
        options,
    })
}

fn string(v: &prost_reflect::Value) -> Option<String> {
    v.as_str().map(str::to_string)
}

fn table_entry(table: &DynamicMessage) -> Result<TableEntry, DecodeError> {
    Ok(TableEntry {
        policy_path: header_field(table, "policy_path", string)?,
        rows: header_field(table, "row", |v| {
            v.as_list()?.iter().map(|row| row.as_bytes().cloned()).collect()
        })?,
    })
}

fn decode_table(
    registry: &SchemaRegistry,
    table: &TableEntry,
    options: DecodeOptions,
) -> DecodedTable {
    let rows = match registry.lookup(&table.policy_path) {
        None => {
            warn!(schema_path = %table.policy_path, "no decoder available");
            DecodedRows::NoDecoder
        }
        Some(desc) => {
            let mut rows = Vec::new();
            let mut failed = 0;
            let shown = options.limit(table.rows.len());
            for (index, row) in table.rows.iter().take(shown).enumerate() {
                match decode_message(desc, row) {
                    Ok(message) => rows.push(DecodedRow { index, message }),
                    Err(e) => {
                        warn!(
                            schema_path = %table.policy_path,
                            row = index,
                            error = %e,
                            "skipping row"
                        );
                        failed += 1;
                    }
                }
            }
            DecodedRows::Decoded { rows, failed }
        }
    };
    DecodedTable {
        policy_path: table.policy_path.clone(),
        row_count: table.rows.len(),
        rows,
    }
}

impl CompactMessage {
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Raw header message as decoded from the wire.
    pub fn header_message(&self) -> &DynamicMessage {
        &self.header_message
    }

    /// Project the message for machine-readable output.
    ///
    /// The header is projected generically and each table's `row` list is
    /// replaced by the projected rows, or by a one-element list holding
    /// [`NO_DECODER_PLACEHOLDER`].
    pub fn to_value(&self) -> Result<Value, DecodeError> {
        let mut value = message_to_value(&self.header_message)?;
        if let Some(Value::List(tables)) = value.get_mut("tables") {
            for (table, decoded) in tables.iter_mut().zip(&self.tables) {
                let rows = match &decoded.rows {
                    DecodedRows::NoDecoder => vec![Value::string(NO_DECODER_PLACEHOLDER)],
                    DecodedRows::Decoded { rows, .. } => rows
                        .iter()
                        .map(|row| message_to_value(&row.message))
                        .collect::<Result<_, _>>()?,
                };
                table
                    .insert("row", Value::List(rows))
                    .map_err(|e| DecodeError::UnrecognisedFieldType {
                        message_name: self.header_message.descriptor().full_name().to_string(),
                        field: "tables".to_string(),
                        detail: e.to_string(),
                    })?;
            }
        }
        Ok(value)
    }

    /// Indented text rendering.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CompactMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(f, "Encoding:    {:#x}", header.encoding)?;
        writeln!(f, "Policy Name: {}", header.policy_name)?;
        writeln!(f, "Version:     {}", header.version)?;
        writeln!(f, "Identifier:  {}", header.identifier)?;
        writeln!(f, "Start Time:  {}", format_timestamp(header.start_time))?;
        writeln!(f, "End Time:    {}", format_timestamp(header.end_time))?;
        writeln!(f, "# Tables:    {}", header.tables.len())?;

        let warning = if self.options.brief {
            " (Only first row displayed)"
        } else {
            ""
        };
        for table in &self.tables {
            indented!(f, 1, "Schema Path: {}", table.policy_path)?;
            indented!(f, 1, "# Rows: {}{warning}", table.row_count)?;
            match &table.rows {
                DecodedRows::NoDecoder => indented!(f, 1, "No decoder available")?,
                DecodedRows::Decoded { rows, .. } => {
                    for row in rows {
                        indented!(f, 2, "Row {}:", row.index)?;
                        write_message(f, &row.message, 2, self.options.brief)?;
                        writeln!(f)?;
                    }
                }
            }
        }
        Ok(())
    }
}
