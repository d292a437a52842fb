//! Driver for the external schema compiler (`protoc`).
//!
//! Schema sources are compiled into a serialized `FileDescriptorSet` which
//! the [`SchemaRegistry`](crate::SchemaRegistry) loads at startup.

use std::{
    env, fs,
    hash::{DefaultHasher, Hash, Hasher},
    io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
    time::SystemTime,
};

use tracing::{debug, info};

use crate::baseline::BASELINE_SOURCES;

/// Errors produced while invoking the schema compiler. All of them are fatal
/// at startup.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("schema compiler '{}' not found", protoc.display())]
    ProtocNotFound { protoc: PathBuf },

    #[error("failed to run schema compiler '{}': {source}", protoc.display())]
    Spawn {
        protoc: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("schema compiler exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("failed to prepare compiler directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Invokes `protoc` to turn schema sources into a descriptor set file.
#[derive(Debug, Clone)]
pub struct SchemaCompiler {
    protoc: PathBuf,
    out_dir: PathBuf,
    include_paths: Vec<PathBuf>,
}

impl SchemaCompiler {
    /// Compiler writing into `out_dir`, using `$PROTOC` or `protoc` from `PATH`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        let protoc = env::var_os("PROTOC")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("protoc"));
        Self {
            protoc,
            out_dir: out_dir.into(),
            include_paths: Vec::new(),
        }
    }

    pub fn with_protoc(mut self, protoc: impl Into<PathBuf>) -> Self {
        self.protoc = protoc.into();
        self
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Directory holding the baseline `.proto` sources inside `out_dir`.
    pub fn baseline_include_dir(&self) -> PathBuf {
        self.out_dir.join("include")
    }

    /// Compile `sources` and return the path of the descriptor set.
    ///
    /// Compilation is skipped when the output already exists and is newer
    /// than every source.
    pub fn compile(&self, sources: &[PathBuf]) -> Result<PathBuf, CompileError> {
        let include_dir = self.write_baseline_sources()?;
        let output = self.out_dir.join(descriptor_set_name(sources));

        if is_up_to_date(&output, sources) {
            debug!(output = %output.display(), "compiled schemas are up to date");
            return Ok(output);
        }

        let mut include_paths = self.include_paths.clone();
        for source in sources {
            if let Some(parent) = source.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !include_paths.iter().any(|p| p == parent) {
                    include_paths.push(parent.to_path_buf());
                }
            }
        }
        include_paths.push(include_dir);

        let mut command = Command::new(&self.protoc);
        command
            .arg("--include_imports")
            .arg(format!("--descriptor_set_out={}", output.display()));
        for path in &include_paths {
            command.arg("-I").arg(path);
        }
        command.args(sources);

        info!(
            protoc = %self.protoc.display(),
            count = sources.len(),
            "compiling schema sources"
        );
        let result = command.output().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CompileError::ProtocNotFound {
                    protoc: self.protoc.clone(),
                }
            } else {
                CompileError::Spawn {
                    protoc: self.protoc.clone(),
                    source,
                }
            }
        })?;

        if !result.status.success() {
            return Err(CompileError::Failed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    fn write_baseline_sources(&self) -> Result<PathBuf, CompileError> {
        let dir = self.baseline_include_dir();
        fs::create_dir_all(&dir).map_err(output_dir_error(&dir))?;

        for (name, text) in BASELINE_SOURCES {
            let path = dir.join(name);
            if fs::read_to_string(&path).is_ok_and(|existing| existing == text) {
                continue;
            }
            fs::write(&path, text).map_err(output_dir_error(&path))?;
        }
        Ok(dir)
    }
}

fn output_dir_error(path: &Path) -> impl FnOnce(io::Error) -> CompileError {
    let path = path.to_path_buf();
    move |source| CompileError::OutputDir { path, source }
}

fn descriptor_set_name(sources: &[PathBuf]) -> String {
    let mut sorted: Vec<&PathBuf> = sources.iter().collect();
    sorted.sort();
    let mut hasher = DefaultHasher::new();
    sorted.hash(&mut hasher);
    format!("schemas-{:016x}.pb", hasher.finish())
}

fn is_up_to_date(output: &Path, sources: &[PathBuf]) -> bool {
    let Some(built) = modified(output) else {
        return false;
    };
    sources
        .iter()
        .all(|source| modified(source).is_some_and(|m| m <= built))
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
