use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use telemetric::{DEFAULT_MAX_MESSAGE_LEN, TelemetryServer, bind};
use telemetric_protobuf::DecodeOptions;
use tracing::info;

use super::RegistryArgs;
use crate::{format::OutputFormat, output::StdoutSink};

#[derive(Args)]
pub struct ListenArgs {
    /// Address to listen on (IPv4 or IPv6)
    address: String,

    /// TCP and UDP port to listen on
    port: u16,

    #[command(flatten)]
    registry: RegistryArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print every table row and key-value field instead of the first
    #[arg(long)]
    all: bool,

    /// Largest accepted TCP message, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_MESSAGE_LEN)]
    max_message_len: usize,
}

impl ListenArgs {
    pub async fn run(self) -> Result<()> {
        let registry = Arc::new(self.registry.load()?);
        let listeners = bind(&self.address, self.port).await?;

        let options = if self.all {
            DecodeOptions::all()
        } else {
            DecodeOptions::brief()
        };
        let server = TelemetryServer::builder(registry, StdoutSink::new(self.format))
            .with_options(options)
            .with_max_message_len(self.max_message_len)
            .build();

        tokio::select! {
            () = server.serve(listeners) => {}
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("interrupted, shutting down");
            }
        }
        Ok(())
    }
}
