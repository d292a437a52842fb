use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use telemetric::{DecodedMessage, MessageSink};
use tracing::error;

use crate::format::OutputFormat;

/// Writes each decoded message to stdout in the chosen format.
pub struct StdoutSink {
    format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn write(&self, message: &DecodedMessage) -> Result<()> {
        let text = match self.format {
            OutputFormat::Text => render_text(message)?,
            OutputFormat::Json => render_json(message)?,
        };
        // One lock per message keeps concurrent sessions from interleaving.
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl MessageSink for StdoutSink {
    fn emit(&self, message: DecodedMessage) {
        if let Err(err) = self.write(&message) {
            error!(msg_type = %message.msg_type(), error = %err, "failed to write message");
        }
    }
}

fn render_text(message: &DecodedMessage) -> Result<String> {
    Ok(match message {
        DecodedMessage::Json(value) => {
            let mut buf = Vec::new();
            let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
            value.serialize(&mut ser)?;
            buf.push(b'\n');
            String::from_utf8(buf)?
        }
        DecodedMessage::Compact(msg) => msg.render(),
        DecodedMessage::KeyValue(msg) => msg.render(),
    })
}

fn render_json(message: &DecodedMessage) -> Result<String> {
    let mut line = match message {
        DecodedMessage::Json(value) => serde_json::to_string(value)?,
        DecodedMessage::Compact(msg) => serde_json::to_string(&msg.to_value()?)?,
        DecodedMessage::KeyValue(msg) => serde_json::to_string(&msg.to_value()?)?,
    };
    line.push('\n');
    Ok(line)
}
