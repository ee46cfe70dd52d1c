//! Build-tool collaborator interface.
//!
//! The packager never resolves dependencies itself. A [`BuildContext`]
//! supplies the resolved dependency artifacts (in the order they should be
//! scanned for imports) and the runtime classpath.

use std::path::{Path, PathBuf};

/// A resolved build dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyArtifact {
    /// Identifier used to name the artifact's scratch directory.
    pub artifact_id: String,
    pub path: PathBuf,
}

impl DependencyArtifact {
    pub fn new(artifact_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            path: path.into(),
        }
    }

    /// Parses the `ID=PATH` form used on the command line.
    ///
    /// Without `=`, the file stem of the path becomes the identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use vdb_packager::DependencyArtifact;
    ///
    /// let dep = DependencyArtifact::parse("libx=deps/libx-1.0.vdb");
    /// assert_eq!(dep.artifact_id, "libx");
    ///
    /// let dep = DependencyArtifact::parse("deps/libx-1.0.vdb");
    /// assert_eq!(dep.artifact_id, "libx-1.0");
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((id, path)) if !id.is_empty() => Self::new(id, path),
            _ => {
                let path = PathBuf::from(raw);
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| raw.to_string());
                Self::new(id, path)
            }
        }
    }

    /// Returns `true` if the artifact file is a packaged VDB.
    pub fn is_vdb(&self) -> bool {
        is_vdb_archive(&self.path)
    }
}

/// Returns `true` for file names ending in `.vdb`.
pub fn is_vdb_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".vdb"))
}

/// Supplies build state to a packaging run.
pub trait BuildContext {
    /// Resolved dependency artifacts, in import scan order.
    fn dependency_artifacts(&self) -> Vec<DependencyArtifact>;

    /// Runtime classpath: directories are gathered as resource roots, files
    /// are archived under `lib/` when libraries are included.
    fn classpath(&self) -> Vec<PathBuf>;
}

/// [`BuildContext`] backed by explicit lists.
#[derive(Debug, Clone, Default)]
pub struct StaticBuildContext {
    pub dependencies: Vec<DependencyArtifact>,
    pub classpath: Vec<PathBuf>,
}

impl StaticBuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dependency(mut self, dependency: DependencyArtifact) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_classpath_entry(mut self, path: impl Into<PathBuf>) -> Self {
        self.classpath.push(path.into());
        self
    }
}

impl BuildContext for StaticBuildContext {
    fn dependency_artifacts(&self) -> Vec<DependencyArtifact> {
        self.dependencies.clone()
    }

    fn classpath(&self) -> Vec<PathBuf> {
        self.classpath.clone()
    }
}
