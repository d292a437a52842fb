mod commands;
mod format;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{listen::ListenArgs, schemas::SchemasArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "telemetric",
    version,
    about = "Receive and print model-driven telemetry"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for telemetry on a TCP and UDP port
    Listen(ListenArgs),
    /// Print the schema paths a set of .proto files registers
    Schemas(SchemasArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Listen(args) => args.run().await,
        Commands::Schemas(args) => args.run(),
    }
}
