//! Packaging configuration.
//!
//! Defines the YAML-serializable settings that locate the descriptor and
//! resources of a VDB project and name the produced archive. Every field has
//! a default, so a file only needs the settings it changes.
//!
//! # Example YAML
//!
//! ```yaml
//! descriptor: src/main/vdb/META-INF/vdb.xml
//! resource_dir: src/main/vdb
//! compiled_dir: target/classes
//! output_dir: target
//! final_name: portfolio-1.0
//! includes:
//!   - README.md
//!   - docs
//! include_libraries: false
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IoContext, Result};

/// Settings for one packaging run.
///
/// Relative paths are resolved against a project base directory with
/// [`resolve_against`](PackagerConfig::resolve_against).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vdb_packager::PackagerConfig;
///
/// let config = PackagerConfig::default().resolve_against("/work/portfolio");
/// assert_eq!(config.output_dir, Path::new("/work/portfolio/target"));
/// assert_eq!(
///     config.archive_path(),
///     Path::new("/work/portfolio/target/vdb.vdb")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    /// Explicit descriptor path, tried before searching `resource_dir`.
    pub descriptor: PathBuf,
    /// Primary resource folder; searched for `*-vdb.xml` / `*-vdb.ddl`.
    pub resource_dir: PathBuf,
    /// Compiled-output folder whose contents join the archive.
    pub compiled_dir: PathBuf,
    /// Build output folder for the archive, scratch and intermediate files.
    pub output_dir: PathBuf,
    /// Archive base name; the archive is `<output_dir>/<final_name>.vdb`.
    pub final_name: String,
    /// Extra files or folders archived at the archive root.
    pub includes: Vec<PathBuf>,
    /// Archive classpath files under `lib/`.
    pub include_libraries: bool,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            descriptor: PathBuf::from("src/main/vdb/META-INF/vdb.xml"),
            resource_dir: PathBuf::from("src/main/vdb"),
            compiled_dir: PathBuf::from("target/classes"),
            output_dir: PathBuf::from("target"),
            final_name: "vdb".to_string(),
            includes: Vec::new(),
            include_libraries: false,
        }
    }
}

impl PackagerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::PackageError::Io) if the file cannot be read, or
    /// [`YamlError`](crate::PackageError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .context_with(|| format!("failed to open config {}", path.display()))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::PackageError::Io) if the file cannot be
    /// written, or [`YamlError`](crate::PackageError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .context_with(|| format!("failed to create config {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns a copy with every relative path joined onto `base`.
    pub fn resolve_against(&self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            descriptor: resolve_path(base, &self.descriptor),
            resource_dir: resolve_path(base, &self.resource_dir),
            compiled_dir: resolve_path(base, &self.compiled_dir),
            output_dir: resolve_path(base, &self.output_dir),
            final_name: self.final_name.clone(),
            includes: self
                .includes
                .iter()
                .map(|path| resolve_path(base, path))
                .collect(),
            include_libraries: self.include_libraries,
        }
    }

    /// Path of the produced archive.
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.vdb", self.final_name))
    }

    /// Path of the merged descriptor written before archiving.
    pub fn merged_descriptor_path(&self) -> PathBuf {
        self.output_dir.join("vdb.xml")
    }

    /// Root under which dependency archives are unpacked.
    pub fn scratch_dir(&self) -> PathBuf {
        self.output_dir.join("vdb-imports")
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
descriptor: custom/portfolio-vdb.xml
resource_dir: vdb
compiled_dir: out/classes
output_dir: out
final_name: portfolio-1.0
includes:
  - README.md
include_libraries: true
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: PackagerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.descriptor, PathBuf::from("custom/portfolio-vdb.xml"));
        assert_eq!(config.resource_dir, PathBuf::from("vdb"));
        assert_eq!(config.final_name, "portfolio-1.0");
        assert_eq!(config.includes, vec![PathBuf::from("README.md")]);
        assert!(config.include_libraries);
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: PackagerConfig = serde_yaml::from_str("final_name: x\n").unwrap();
        assert_eq!(config.final_name, "x");
        assert_eq!(config.resource_dir, PathBuf::from("src/main/vdb"));
        assert!(config.includes.is_empty());
        assert!(!config.include_libraries);
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let mut config = PackagerConfig::default();
        config.output_dir = PathBuf::from("/abs/out");
        let resolved = config.resolve_against("/base");
        assert_eq!(resolved.output_dir, PathBuf::from("/abs/out"));
        assert_eq!(resolved.resource_dir, PathBuf::from("/base/src/main/vdb"));
        assert_eq!(resolved.scratch_dir(), PathBuf::from("/abs/out/vdb-imports"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vdb-packager.yml");

        let original: PackagerConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = PackagerConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = PackagerConfig::load("/nonexistent/vdb-packager.yml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vdb-packager.yml"));
    }
}
