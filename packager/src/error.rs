//! Error types for packaging operations.
//!
//! Every failure is fatal to a packaging run. I/O failures carry the
//! operation that was attempted so messages point at the offending path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use vdb_core::{DescriptorError, MergeError};

/// Errors that can occur while packaging a VDB.
#[derive(Debug, Error)]
pub enum PackageError {
    /// No descriptor file could be located.
    #[error("no VDB descriptor found: looked for {0}")]
    DescriptorNotFound(String),

    /// A dependency archive has no `META-INF/vdb.xml`.
    #[error("dependency {artifact} does not contain a VDB descriptor")]
    DependencyDescriptorMissing { artifact: String },

    /// The descriptor failed structural validation.
    #[error("invalid VDB descriptor {path}: {reason}")]
    InvalidDescriptor { path: PathBuf, reason: String },

    /// A descriptor could not be parsed.
    #[error("failed to parse descriptor {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },

    /// Nested import or conflicting policy/model while merging.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// A file or folder slated for archiving does not exist.
    #[error("folder or file not found: {0}")]
    MissingResource(PathBuf),

    /// Two sources map to the same archive entry.
    #[error("duplicate archive entry: {0}")]
    DuplicateEntry(String),

    /// An archive entry would be extracted outside its destination.
    #[error("unsafe entry path in archive {archive}: {entry}")]
    UnsafeEntryPath { archive: PathBuf, entry: String },

    /// File I/O failure, with the operation that was attempted.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the ZIP container failed.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Descriptor serialization failure.
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PackageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: DescriptorError) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Attaches an operation description to I/O results.
pub(crate) trait IoContext<T> {
    fn context_with(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn context_with(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|source| PackageError::io(context(), source))
    }
}

/// Convenience alias for results with [`PackageError`].
pub type Result<T> = std::result::Result<T, PackageError>;
