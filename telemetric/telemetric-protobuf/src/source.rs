//! Textual scan of schema sources for the row message and its `schema_path`.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Errors produced while scanning a schema source file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read schema source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema source {path} has no top-level `message <Name>` declaration")]
    MissingMessage { path: PathBuf },

    #[error("schema source {path} has no `schema_path` annotation")]
    MissingSchemaPath { path: PathBuf },
}

/// A schema source file and the registration it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    pub path: PathBuf,
    pub package: Option<String>,
    pub message_name: String,
    pub schema_path: String,
}

impl SchemaSource {
    /// Read `path` and scan it.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Scan source text without parsing it.
    ///
    /// The first line starting with `message <Name>` names the message; the
    /// first later line containing `schema_path = "<path>"` gives the path.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, SourceError> {
        let path = path.into();
        let mut package = None;
        let mut message_name = None;
        let mut schema_path = None;

        for line in text.lines() {
            if message_name.is_none() {
                if package.is_none() {
                    package = scan_package(line);
                }
                message_name = scan_message(line);
                continue;
            }
            if let Some(found) = scan_schema_path(line) {
                schema_path = Some(found);
                break;
            }
        }

        let Some(message_name) = message_name else {
            return Err(SourceError::MissingMessage { path });
        };
        let Some(schema_path) = schema_path else {
            return Err(SourceError::MissingSchemaPath { path });
        };
        Ok(Self {
            path,
            package,
            message_name,
            schema_path,
        })
    }

    /// Message name qualified with the declared package, if any.
    pub fn full_message_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{package}.{}", self.message_name),
            None => self.message_name.clone(),
        }
    }
}

fn scan_message(line: &str) -> Option<String> {
    let rest = line.strip_prefix("message ")?;
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '{')
        .collect();
    (!name.is_empty()).then_some(name)
}

fn scan_package(line: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix("package ")?;
    let name = rest.trim().trim_end_matches(';').trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn scan_schema_path(line: &str) -> Option<String> {
    const KEY: &str = "schema_path";
    let start = line.find(KEY)? + KEY.len();
    // `option (cisco.schema_path) = "..."` closes the extension name first.
    let rest = line[start..].trim_start();
    let rest = rest.strip_prefix(')').unwrap_or(rest).trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    let value = &rest[..end];
    (!value.is_empty() && !value.contains(char::is_whitespace)).then(|| value.to_string())
}
