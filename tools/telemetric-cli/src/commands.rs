pub mod listen;
pub mod schemas;

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use telemetric_protobuf::{SchemaCompiler, SchemaRegistry};

/// Options shared by every command that builds a schema registry.
#[derive(Args)]
pub struct RegistryArgs {
    /// Row schema .proto file (repeatable)
    #[arg(long = "proto", value_name = "FILE")]
    protos: Vec<PathBuf>,

    /// Directory whose .proto files are all loaded as row schemas
    /// (repeatable)
    #[arg(long = "proto-dir", value_name = "DIR")]
    proto_dirs: Vec<PathBuf>,

    /// Directory searched for imports (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include_paths: Vec<PathBuf>,

    /// Directory for compiled descriptor sets
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Path to the protoc executable
    #[arg(long, env = "PROTOC", default_value = "protoc")]
    protoc: PathBuf,
}

impl RegistryArgs {
    pub fn load(&self) -> Result<SchemaRegistry> {
        let out_dir = self
            .out_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("telemetric"));
        let mut compiler = SchemaCompiler::new(out_dir).with_protoc(&self.protoc);

        for dir in &self.include_paths {
            compiler = compiler.with_include_path(dir);
        }

        let mut sources = self.protos.clone();
        for dir in &self.proto_dirs {
            sources.extend(proto_files(dir)?);
        }

        Ok(SchemaRegistry::load(&compiler, &sources)?)
    }
}

fn proto_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "proto") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
