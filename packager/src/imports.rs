//! Import resolution against dependency archives.
//!
//! [`resolve_imports`] scans the dependency artifacts in the given order,
//! unpacks every VDB among them, and folds each one that matches an import
//! of the top descriptor into it with [`merge_import`]. Dependencies that
//! match nothing contribute nothing, not even their files. Imports that
//! match no dependency stay in the descriptor.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use vdb_core::{DESCRIPTOR_ENTRY, Import, VdbDescriptor, check_importable, merge_import};

use crate::context::DependencyArtifact;
use crate::error::{PackageError, Result};
use crate::locate::load_descriptor;
use crate::unpack::unpack;

/// A dependency that was merged into the top descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedImport {
    pub artifact_id: String,
    pub import: Import,
    /// Models contributed by the dependency.
    pub models: Vec<String>,
    /// Where the dependency was unpacked.
    pub root: PathBuf,
}

/// Outcome of resolving the imports of one descriptor.
#[derive(Debug, Clone)]
pub struct ImportResolution {
    /// Top descriptor with every matched dependency merged in.
    pub descriptor: VdbDescriptor,
    /// Matched dependencies, in scan order.
    pub merged: Vec<MergedImport>,
}

impl ImportResolution {
    /// Unpacked dependency directories to gather, in scan order.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.merged.iter().map(|m| m.root.clone()).collect()
    }

    /// Imports no dependency matched.
    pub fn unresolved(&self) -> &[Import] {
        &self.descriptor.imports
    }
}

/// Merges every dependency that satisfies an import of `top`.
///
/// `dependencies` are scanned in order; that order decides which dependency
/// wins when visibility or translator overrides collide. Non-VDB artifacts
/// are skipped. Every VDB artifact is unpacked under `scratch_root` so its
/// descriptor can be read.
///
/// A descriptor without imports is returned unchanged and nothing is
/// unpacked.
///
/// # Errors
///
/// - [`PackageError::Merge`] for a dependency that declares imports itself
///   or defines a data policy already present in the top descriptor.
/// - [`PackageError::DependencyDescriptorMissing`] if a VDB artifact has no
///   `META-INF/vdb.xml`.
/// - [`PackageError::Io`], [`PackageError::Zip`] or [`PackageError::Parse`]
///   if a dependency cannot be unpacked or read.
pub fn resolve_imports(
    top: VdbDescriptor,
    dependencies: &[DependencyArtifact],
    scratch_root: &Path,
) -> Result<ImportResolution> {
    if !top.has_imports() {
        debug!(vdb = %top.identity(), "No imports declared; skipping dependency scan");
        return Ok(ImportResolution {
            descriptor: top,
            merged: Vec::new(),
        });
    }

    let mut descriptor = top;
    let mut merged = Vec::new();

    for dependency in dependencies {
        if !dependency.is_vdb() {
            debug!(artifact = %dependency.artifact_id, "Skipping non-VDB dependency");
            continue;
        }

        let root = unpack(&dependency.path, scratch_root, &dependency.artifact_id)?;
        let child_path = root.join(DESCRIPTOR_ENTRY);
        if !child_path.is_file() {
            return Err(PackageError::DependencyDescriptorMissing {
                artifact: dependency.artifact_id.clone(),
            });
        }
        let child = load_descriptor(&child_path)?;
        check_importable(&child)?;

        let Some(import) = descriptor.find_import(&child.name, &child.version).cloned() else {
            debug!(
                artifact = %dependency.artifact_id,
                vdb = %child.identity(),
                "Dependency matches no import; ignoring"
            );
            continue;
        };

        for model in child.models.keys().filter(|m| descriptor.models.contains_key(*m)) {
            warn!(
                artifact = %dependency.artifact_id,
                model = %model,
                "Imported model replaces a model of the same name"
            );
        }
        let models = child.model_names();
        descriptor = merge_import(descriptor, child, &import)?;
        info!(
            artifact = %dependency.artifact_id,
            import = %format!("{}@{}", import.name, import.version),
            models = models.len(),
            "Merged imported VDB"
        );
        merged.push(MergedImport {
            artifact_id: dependency.artifact_id.clone(),
            import,
            models,
            root,
        });
    }

    for import in &descriptor.imports {
        warn!(
            import = %format!("{}@{}", import.name, import.version),
            "Import not satisfied by any dependency"
        );
    }

    Ok(ImportResolution { descriptor, merged })
}
