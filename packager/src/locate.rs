//! Descriptor discovery.
//!
//! A project has exactly one descriptor, either the standard XML form or the
//! flat DDL form. [`locate_descriptor`] tries the configured path first and
//! otherwise takes the first `*-vdb.xml` / `*-vdb.ddl` file (by name) in the
//! resource folder.

use std::path::{Path, PathBuf};

use tracing::info;
use vdb_core::{VdbDescriptor, parse_descriptor};

use crate::error::{IoContext, PackageError, Result};

const XML_SUFFIX: &str = "-vdb.xml";
const DDL_SUFFIX: &str = "-vdb.ddl";

/// The descriptor a packaging run starts from.
///
/// Import merging is only defined for [`Standard`](Self::Standard)
/// descriptors; the DDL form is archived verbatim.
///
/// # Examples
///
/// ```
/// use vdb_packager::DescriptorSource;
///
/// let ddl = DescriptorSource::from_path("src/main/vdb/portfolio-vdb.ddl");
/// assert!(matches!(ddl, DescriptorSource::FlatDeclarative(_)));
///
/// let xml = DescriptorSource::from_path("src/main/vdb/META-INF/vdb.xml");
/// assert!(matches!(xml, DescriptorSource::Standard(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
    /// XML descriptor that may declare imports.
    Standard(PathBuf),
    /// Flat `*-vdb.ddl` declaration.
    FlatDeclarative(PathBuf),
}

impl DescriptorSource {
    /// Classifies a descriptor file by its extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_ddl = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ddl"));
        if is_ddl {
            Self::FlatDeclarative(path)
        } else {
            Self::Standard(path)
        }
    }

    /// Path of the descriptor file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Standard(path) | Self::FlatDeclarative(path) => path,
        }
    }
}

fn is_descriptor_name(name: &str) -> bool {
    name.ends_with(XML_SUFFIX) || name.ends_with(DDL_SUFFIX)
}

/// Finds the project descriptor.
///
/// # Errors
///
/// Returns [`PackageError::DescriptorNotFound`] if neither `explicit` exists
/// nor `resource_dir` contains a matching file, or
/// [`PackageError::Io`] if `resource_dir` cannot be listed.
pub fn locate_descriptor(explicit: &Path, resource_dir: &Path) -> Result<DescriptorSource> {
    if explicit.is_file() {
        info!(path = %explicit.display(), "Found VDB descriptor");
        return Ok(DescriptorSource::from_path(explicit));
    }

    if resource_dir.is_dir() {
        let entries = std::fs::read_dir(resource_dir)
            .context_with(|| format!("failed to list {}", resource_dir.display()))?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry =
                entry.context_with(|| format!("failed to list {}", resource_dir.display()))?;
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_descriptor_name);
            if matches && path.is_file() {
                candidates.push(path);
            }
        }
        candidates.sort();
        if let Some(path) = candidates.into_iter().next() {
            info!(path = %path.display(), "Found VDB descriptor");
            return Ok(DescriptorSource::from_path(path));
        }
    }

    Err(PackageError::DescriptorNotFound(format!(
        "{} or *{XML_SUFFIX} / *{DDL_SUFFIX} in {}",
        explicit.display(),
        resource_dir.display()
    )))
}

/// Reads and parses a standard descriptor file.
///
/// # Errors
///
/// Returns [`PackageError::Io`] if the file cannot be read, or
/// [`PackageError::Parse`] if it is not a valid descriptor.
pub fn load_descriptor(path: &Path) -> Result<VdbDescriptor> {
    let bytes = std::fs::read(path)
        .context_with(|| format!("failed to read descriptor {}", path.display()))?;
    parse_descriptor(&bytes).map_err(|source| PackageError::parse(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("vdb.xml");
        std::fs::write(&explicit, "<vdb name=\"a\"/>").unwrap();
        std::fs::write(dir.path().join("other-vdb.xml"), "<vdb name=\"b\"/>").unwrap();

        let found = locate_descriptor(&explicit, dir.path()).unwrap();
        assert_eq!(found, DescriptorSource::Standard(explicit));
    }

    #[test]
    fn test_search_takes_first_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b-vdb.xml"), "").unwrap();
        std::fs::write(dir.path().join("a-vdb.ddl"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = locate_descriptor(&dir.path().join("missing.xml"), dir.path()).unwrap();
        assert_eq!(
            found,
            DescriptorSource::FlatDeclarative(dir.path().join("a-vdb.ddl"))
        );
    }

    #[test]
    fn test_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vdb.txt"), "").unwrap();

        let err = locate_descriptor(&dir.path().join("missing.xml"), dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::DescriptorNotFound(_)));
    }

    #[test]
    fn test_load_descriptor_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken-vdb.xml");
        std::fs::write(&path, "<model name=\"m\"/>").unwrap();

        let err = load_descriptor(&path).unwrap_err();
        assert!(matches!(err, PackageError::Parse { .. }));
        assert!(err.to_string().contains("broken-vdb.xml"));
    }
}
