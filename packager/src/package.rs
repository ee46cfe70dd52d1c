//! The packaging pipeline.
//!
//! [`package_vdb`] turns a project laid out per [`PackagerConfig`] into a
//! `.vdb` archive:
//!
//! 1. locate the descriptor;
//! 2. for a DDL descriptor, archive it alone at `META-INF/vdb.ddl`;
//! 3. otherwise validate it, resolve its imports against the build
//!    dependencies, gather every content root, and write the archive with the
//!    merged descriptor last at `META-INF/vdb.xml`.
//!
//! Import failures abort before the archive is created.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use vdb_core::{
    DDL_DESCRIPTOR_ENTRY, DESCRIPTOR_ENTRY, Import, VdbDescriptor, serialize_descriptor,
    validate_descriptor,
};

use crate::archive::ArchiveWriter;
use crate::config::PackagerConfig;
use crate::context::{BuildContext, DependencyArtifact};
use crate::error::{IoContext, PackageError, Result};
use crate::gather::EntrySet;
use crate::imports::{ImportResolution, MergedImport, resolve_imports};
use crate::locate::{DescriptorSource, load_descriptor, locate_descriptor};

/// Result of a packaging run.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// The written archive.
    pub archive: PathBuf,
    /// Descriptor the run started from.
    pub source: DescriptorSource,
    /// Merged descriptor; `None` for DDL descriptors.
    pub descriptor: Option<VdbDescriptor>,
    /// Dependencies merged into the descriptor.
    pub merged: Vec<MergedImport>,
    /// Archive entry names in write order.
    pub entries: Vec<String>,
}

impl PackageOutcome {
    /// Imports no dependency satisfied.
    pub fn unresolved_imports(&self) -> &[Import] {
        self.descriptor
            .as_ref()
            .map(|d| d.imports.as_slice())
            .unwrap_or_default()
    }
}

/// Loads a standard descriptor and rejects it if validation finds problems.
///
/// # Errors
///
/// Returns [`PackageError::InvalidDescriptor`] listing every validation
/// problem, or the errors of [`load_descriptor`].
pub fn load_validated(path: &Path) -> Result<VdbDescriptor> {
    let descriptor = load_descriptor(path)?;
    let problems = validate_descriptor(&descriptor);
    if !problems.is_empty() {
        let reason = problems
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PackageError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason,
        });
    }
    Ok(descriptor)
}

/// Loads the descriptor at `path` and merges every matching dependency.
///
/// This is the import step of [`package_vdb`] on its own; nothing is
/// archived.
///
/// # Errors
///
/// See [`load_validated`] and [`resolve_imports`].
pub fn merge_descriptor(
    path: &Path,
    dependencies: &[DependencyArtifact],
    scratch_root: &Path,
) -> Result<ImportResolution> {
    let descriptor = load_validated(path)?;
    resolve_imports(descriptor, dependencies, scratch_root)
}

/// Packages the project described by `config`.
///
/// Relative paths in `config` are used as-is; resolve them first with
/// [`PackagerConfig::resolve_against`].
///
/// # Errors
///
/// - [`PackageError::DescriptorNotFound`] if no descriptor can be located.
/// - [`PackageError::InvalidDescriptor`] or [`PackageError::Parse`] for a
///   bad top descriptor.
/// - [`PackageError::Merge`] and friends from import resolution; no archive
///   is written in that case.
/// - [`PackageError::MissingResource`] for a configured include that does
///   not exist.
/// - [`PackageError::Io`] / [`PackageError::Zip`] on write failure.
pub fn package_vdb(config: &PackagerConfig, ctx: &dyn BuildContext) -> Result<PackageOutcome> {
    let source = locate_descriptor(&config.descriptor, &config.resource_dir)?;
    match &source {
        DescriptorSource::FlatDeclarative(path) => package_ddl(config, path, source.clone()),
        DescriptorSource::Standard(path) => package_standard(config, ctx, path, source.clone()),
    }
}

fn package_ddl(
    config: &PackagerConfig,
    path: &Path,
    source: DescriptorSource,
) -> Result<PackageOutcome> {
    let archive_path = config.archive_path();
    let mut archive = ArchiveWriter::create(&archive_path)?;
    archive.add_file(DDL_DESCRIPTOR_ENTRY, path)?;
    let entries = archive.finish()?;
    info!(archive = %archive_path.display(), "Packaged DDL VDB");

    Ok(PackageOutcome {
        archive: archive_path,
        source,
        descriptor: None,
        merged: Vec::new(),
        entries,
    })
}

fn package_standard(
    config: &PackagerConfig,
    ctx: &dyn BuildContext,
    path: &Path,
    source: DescriptorSource,
) -> Result<PackageOutcome> {
    let dependencies = ctx.dependency_artifacts();
    let classpath = ctx.classpath();
    let resolution = merge_descriptor(path, &dependencies, &config.scratch_dir())?;

    let mut roots = Vec::new();
    if config.compiled_dir.is_dir() {
        roots.push(config.compiled_dir.clone());
    }
    roots.extend(classpath.iter().filter(|p| p.is_dir()).cloned());
    if config.resource_dir.is_dir() {
        roots.push(config.resource_dir.clone());
    }
    roots.extend(resolution.roots());

    let mut content = EntrySet::new();
    for root in &roots {
        let added = content.add_root(root)?;
        debug!(root = %root.display(), entries = added, "Gathered resources");
    }

    let descriptor_path = config.merged_descriptor_path();
    write_merged_descriptor(&resolution.descriptor, &descriptor_path)?;

    let archive_path = config.archive_path();
    let mut archive = ArchiveWriter::create(&archive_path)?;
    for entry in content.iter() {
        archive.add_entry(entry)?;
    }
    for include in &config.includes {
        archive.add_tree("", include)?;
    }
    if config.include_libraries {
        let libraries: Vec<_> = classpath.iter().filter(|p| p.is_file()).collect();
        if !libraries.is_empty() {
            archive.add_directory("lib")?;
        }
        for library in libraries {
            archive.add_tree("lib/", library)?;
        }
    }
    archive.add_file(DESCRIPTOR_ENTRY, &descriptor_path)?;
    let entries = archive.finish()?;

    info!(
        archive = %archive_path.display(),
        vdb = %resolution.descriptor.identity(),
        entries = entries.len(),
        imports_merged = resolution.merged.len(),
        "Packaged VDB"
    );

    Ok(PackageOutcome {
        archive: archive_path,
        source,
        descriptor: Some(resolution.descriptor),
        merged: resolution.merged,
        entries,
    })
}

fn write_merged_descriptor(descriptor: &VdbDescriptor, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .context_with(|| format!("failed to create {}", parent.display()))?;
    }
    let bytes = serialize_descriptor(descriptor)?;
    std::fs::write(path, bytes)
        .context_with(|| format!("failed to write descriptor {}", path.display()))?;
    debug!(path = %path.display(), "Wrote merged descriptor");
    Ok(())
}
