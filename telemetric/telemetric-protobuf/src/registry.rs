//! Immutable mapping from schema path to row message descriptor.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use prost::Message;
use prost_reflect::{DescriptorError, DescriptorPool, MessageDescriptor};
use prost_types::FileDescriptorSet;
use tracing::{debug, info};

use crate::{
    baseline::{COMPACT_HEADER_MESSAGE, KEY_VALUE_HEADER_MESSAGE, baseline_pool},
    compiler::{CompileError, SchemaCompiler},
    source::{SchemaSource, SourceError},
};

/// Errors produced while building a [`SchemaRegistry`]. All of them are
/// startup errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to load baseline schemas: {0}")]
    Baseline(#[source] DescriptorError),

    #[error("failed to decode descriptor set: {0}")]
    DescriptorSetDecode(#[from] prost::DecodeError),

    #[error("invalid descriptor in set: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("failed to read descriptor set {}: {source}", path.display())]
    ReadDescriptorSet {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("message '{message_name}' for schema path '{schema_path}' not found")]
    UnknownMessage {
        schema_path: String,
        message_name: String,
    },

    #[error("baseline message '{message_name}' missing from descriptor pool")]
    MissingBaseline { message_name: &'static str },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Schema path to message descriptor mapping, plus the baseline headers.
///
/// Read-only once built; share it between sessions behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    pool: DescriptorPool,
    schemas: BTreeMap<String, MessageDescriptor>,
    compact_header: MessageDescriptor,
    key_value_header: MessageDescriptor,
}

/// Builder for [`SchemaRegistry`].
#[derive(Debug)]
pub struct SchemaRegistryBuilder {
    pool: DescriptorPool,
    entries: Vec<(String, String)>,
}

impl SchemaRegistry {
    /// Create a builder seeded with the baseline schemas.
    pub fn builder() -> Result<SchemaRegistryBuilder, RegistryError> {
        let pool = baseline_pool().map_err(RegistryError::Baseline)?;
        Ok(SchemaRegistryBuilder {
            pool,
            entries: Vec::new(),
        })
    }

    /// Registry holding only the baseline schemas.
    pub fn baseline() -> Result<Self, RegistryError> {
        Self::builder()?.build()
    }

    /// Scan, compile and register every schema source in `paths`.
    ///
    /// The compiler is not invoked when `paths` is empty.
    pub fn load(compiler: &SchemaCompiler, paths: &[PathBuf]) -> Result<Self, RegistryError> {
        let sources = paths
            .iter()
            .map(SchemaSource::read)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = Self::builder()?;
        if !sources.is_empty() {
            let descriptor_set = compiler.compile(paths)?;
            builder = builder.add_descriptor_set_file(&descriptor_set)?;
        }
        for source in &sources {
            debug!(
                path = %source.path.display(),
                schema_path = %source.schema_path,
                message = %source.full_message_name(),
                "scanned schema source"
            );
            builder = builder.register(&source.schema_path, source.full_message_name());
        }

        let registry = builder.build()?;
        info!(schemas = registry.len(), "schema registry ready");
        Ok(registry)
    }

    /// Row message registered for `schema_path`.
    ///
    /// `None` is an expected outcome: the caller emits a placeholder.
    pub fn lookup(&self, schema_path: &str) -> Option<&MessageDescriptor> {
        self.schemas.get(schema_path)
    }

    /// Descriptor of `telemetry.TelemetryHeader`.
    pub fn compact_header(&self) -> &MessageDescriptor {
        &self.compact_header
    }

    /// Descriptor of `telemetry_kv.Telemetry`.
    pub fn key_value_header(&self) -> &MessageDescriptor {
        &self.key_value_header
    }

    /// Registered schema paths in sorted order.
    pub fn schema_paths(&self) -> impl Iterator<Item = (&str, &MessageDescriptor)> {
        self.schemas.iter().map(|(path, desc)| (path.as_str(), desc))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

impl SchemaRegistryBuilder {
    /// Merge a serialized `FileDescriptorSet`.
    ///
    /// Files already present in the pool (the baseline files in particular)
    /// are skipped, so sets produced with `--include_imports` merge cleanly.
    pub fn add_file_descriptor_set(mut self, bytes: &[u8]) -> Result<Self, RegistryError> {
        let set = FileDescriptorSet::decode(bytes)?;
        for file in set.file {
            if self.pool.get_file_by_name(file.name()).is_some() {
                debug!(file = file.name(), "descriptor already loaded");
                continue;
            }
            self.pool.add_file_descriptor_proto(file)?;
        }
        Ok(self)
    }

    /// Merge a `FileDescriptorSet` stored at `path`.
    pub fn add_descriptor_set_file(self, path: &Path) -> Result<Self, RegistryError> {
        let bytes = fs::read(path).map_err(|source| RegistryError::ReadDescriptorSet {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_file_descriptor_set(&bytes)
    }

    /// Map `schema_path` to the fully-qualified `message_name`.
    ///
    /// A later registration for the same path replaces the earlier one.
    pub fn register(
        mut self,
        schema_path: impl Into<String>,
        message_name: impl Into<String>,
    ) -> Self {
        self.entries.push((schema_path.into(), message_name.into()));
        self
    }

    /// Resolve every registration against the pool.
    pub fn build(self) -> Result<SchemaRegistry, RegistryError> {
        let mut schemas = BTreeMap::new();
        for (schema_path, message_name) in self.entries {
            let Some(desc) = self.pool.get_message_by_name(&message_name) else {
                return Err(RegistryError::UnknownMessage {
                    schema_path,
                    message_name,
                });
            };
            schemas.insert(schema_path, desc);
        }

        let compact_header = baseline_message(&self.pool, COMPACT_HEADER_MESSAGE)?;
        let key_value_header = baseline_message(&self.pool, KEY_VALUE_HEADER_MESSAGE)?;
        Ok(SchemaRegistry {
            pool: self.pool,
            schemas,
            compact_header,
            key_value_header,
        })
    }
}

fn baseline_message(
    pool: &DescriptorPool,
    message_name: &'static str,
) -> Result<MessageDescriptor, RegistryError> {
    pool.get_message_by_name(message_name)
        .ok_or(RegistryError::MissingBaseline { message_name })
}
