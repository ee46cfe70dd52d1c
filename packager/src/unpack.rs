//! Dependency archive extraction.
//!
//! A built VDB archive is unpacked into a per-artifact directory under the
//! scratch root so its descriptor can be parsed and its resources gathered
//! like any other root. The directory is emptied first; nothing from an
//! earlier run survives.
//! The archive is not checked for being a VDB here; a missing or malformed
//! descriptor surfaces when it is parsed.

use std::fs::File;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{IoContext, PackageError, Result};

/// Returns the scratch directory used for `artifact_id`.
///
/// The name is the identifier with path-unsafe characters replaced, followed
/// by a short digest of the raw identifier, so `org.acme:libx` and
/// `org.acme_libx` get distinct directories.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use vdb_packager::unpack_dir;
///
/// let dir = unpack_dir(Path::new("target/vdb-imports"), "org.acme:libx");
/// assert!(dir.starts_with("target/vdb-imports"));
/// assert!(dir.file_name().unwrap().to_str().unwrap().starts_with("org.acme_libx-"));
/// assert_ne!(dir, unpack_dir(Path::new("target/vdb-imports"), "org.acme_libx"));
/// ```
pub fn unpack_dir(scratch_root: &Path, artifact_id: &str) -> PathBuf {
    let safe: String = artifact_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let digest = format!("{:x}", Sha256::digest(artifact_id.as_bytes()));
    scratch_root.join(format!("{safe}-{}", &digest[..8]))
}

/// Extracts `archive` into the scratch directory for `artifact_id`.
///
/// Any previous contents of the directory are removed first. Returns the
/// directory the archive was extracted into.
///
/// # Errors
///
/// Returns [`PackageError::Io`] or [`PackageError::Zip`] on read/write
/// failure, and [`PackageError::UnsafeEntryPath`] for entries that would
/// land outside the destination.
pub fn unpack(archive: &Path, scratch_root: &Path, artifact_id: &str) -> Result<PathBuf> {
    let destination = unpack_dir(scratch_root, artifact_id);
    if destination.exists() {
        std::fs::remove_dir_all(&destination)
            .context_with(|| format!("failed to clear {}", destination.display()))?;
    }
    std::fs::create_dir_all(&destination)
        .context_with(|| format!("failed to create {}", destination.display()))?;

    let file =
        File::open(archive).context_with(|| format!("failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| PackageError::UnsafeEntryPath {
                archive: archive.to_path_buf(),
                entry: entry.name().to_string(),
            })?;
        let out_path = destination.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .context_with(|| format!("failed to create {}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .context_with(|| format!("failed to create {}", parent.display()))?;
        }
        let mut out = File::create(&out_path)
            .context_with(|| format!("failed to create {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out)
            .context_with(|| format!("failed to write {}", out_path.display()))?;
        debug!(entry = %out_path.display(), "Unpacked");
    }

    Ok(destination)
}
