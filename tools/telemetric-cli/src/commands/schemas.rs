use anyhow::Result;
use clap::Args;

use super::RegistryArgs;

#[derive(Args)]
pub struct SchemasArgs {
    #[command(flatten)]
    registry: RegistryArgs,
}

impl SchemasArgs {
    pub fn run(self) -> Result<()> {
        let registry = self.registry.load()?;
        for (path, message) in registry.schema_paths() {
            println!("{path} -> {}", message.full_name());
        }
        Ok(())
    }
}
