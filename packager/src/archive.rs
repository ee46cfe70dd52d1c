//! ZIP archive writing.
//!
//! [`ArchiveWriter`] streams files into a `.vdb` container. Entry names are
//! `/`-separated and relative to the archive root. Every file entry name can
//! be written once; directories may be announced repeatedly.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{IoContext, PackageError, Result};
use crate::gather::{EntryKind, GatheredEntry, gather};

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated)
}

/// Writer for one archive file.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vdb_packager::ArchiveWriter;
///
/// let mut archive = ArchiveWriter::create(Path::new("target/portfolio.vdb")).unwrap();
/// archive.add_tree("", Path::new("README.md")).unwrap();
/// archive.add_bytes("META-INF/vdb.xml", b"<vdb name=\"portfolio\"/>").unwrap();
/// archive.finish().unwrap();
/// ```
pub struct ArchiveWriter {
    zip: ZipWriter<File>,
    path: PathBuf,
    names: HashSet<String>,
    written: Vec<String>,
}

impl std::fmt::Debug for ArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("path", &self.path)
            .field("entries", &self.written.len())
            .finish()
    }
}

impl ArchiveWriter {
    /// Creates (or truncates) the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] if the file or its parent directory
    /// cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context_with(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = File::create(path)
            .context_with(|| format!("failed to create archive {}", path.display()))?;
        Ok(Self {
            zip: ZipWriter::new(file),
            path: path.to_path_buf(),
            names: HashSet::new(),
            written: Vec::new(),
        })
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if !self.names.insert(name.to_string()) {
            return Err(PackageError::DuplicateEntry(name.to_string()));
        }
        self.written.push(name.to_string());
        Ok(())
    }

    /// Copies `source` into the archive as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::MissingResource`] if `source` does not exist
    /// and [`PackageError::DuplicateEntry`] if `name` was already written.
    pub fn add_file(&mut self, name: &str, source: &Path) -> Result<()> {
        if !source.is_file() {
            return Err(PackageError::MissingResource(source.to_path_buf()));
        }
        self.claim(name)?;
        let mut input = File::open(source)
            .context_with(|| format!("failed to open {}", source.display()))?;
        self.zip.start_file(name, file_options())?;
        std::io::copy(&mut input, &mut self.zip)
            .context_with(|| format!("failed to archive {}", source.display()))?;
        debug!(entry = name, "Added file");
        Ok(())
    }

    /// Writes in-memory content as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::DuplicateEntry`] if `name` was already written.
    pub fn add_bytes(&mut self, name: &str, content: &[u8]) -> Result<()> {
        self.claim(name)?;
        self.zip.start_file(name, file_options())?;
        std::io::Write::write_all(&mut self.zip, content)
            .context_with(|| format!("failed to write entry {name}"))?;
        debug!(entry = name, "Added content");
        Ok(())
    }

    /// Adds a directory entry. Repeated directories are ignored.
    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        let key = format!("{}/", name.trim_end_matches('/'));
        if self.names.contains(&key) {
            return Ok(());
        }
        self.claim(&key)?;
        self.zip.add_directory(key.as_str(), file_options())?;
        Ok(())
    }

    /// Writes a gathered entry under its own name.
    pub fn add_entry(&mut self, entry: &GatheredEntry) -> Result<()> {
        match entry.kind {
            EntryKind::Directory => self.add_directory(&entry.name),
            EntryKind::File => self.add_file(&entry.name, &entry.source),
        }
    }

    /// Writes `source` as `<prefix><file name>`, recursing into directories.
    ///
    /// Descriptor files inside a directory are skipped, as in
    /// [`gather`].
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::MissingResource`] if `source` does not exist.
    pub fn add_tree(&mut self, prefix: &str, source: &Path) -> Result<()> {
        if !source.exists() {
            return Err(PackageError::MissingResource(source.to_path_buf()));
        }
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{prefix}{file_name}");

        if source.is_file() {
            return self.add_file(&name, source);
        }

        self.add_directory(&name)?;
        for entry in gather(source) {
            let entry = entry?;
            let nested = GatheredEntry {
                name: format!("{name}/{}", entry.name),
                ..entry
            };
            self.add_entry(&nested)?;
        }
        Ok(())
    }

    /// Names written so far, in order. Directory names end with `/`.
    pub fn entries(&self) -> &[String] {
        &self.written
    }

    /// Finalizes the archive and returns the written entry names.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Zip`] if the central directory cannot be
    /// written.
    pub fn finish(self) -> Result<Vec<String>> {
        self.zip.finish()?;
        debug!(archive = %self.path.display(), entries = self.written.len(), "Archive finished");
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn read_entries(path: &Path) -> Vec<String> {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_add_tree_prefixes_names() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("api")).unwrap();
        std::fs::write(docs.join("api/index.md"), "# api").unwrap();
        std::fs::write(docs.join("vdb.xml"), "<vdb/>").unwrap();

        let path = dir.path().join("out.vdb");
        let mut archive = ArchiveWriter::create(&path).unwrap();
        archive.add_tree("", &docs).unwrap();
        archive.finish().unwrap();

        assert_eq!(
            read_entries(&path),
            vec!["docs/", "docs/api/", "docs/api/index.md"]
        );
        assert_eq!(read_entry(&path, "docs/api/index.md"), "# api");
    }

    #[test]
    fn test_missing_resource() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = ArchiveWriter::create(&dir.path().join("out.vdb")).unwrap();
        let missing = dir.path().join("gone.txt");

        let err = archive.add_tree("", &missing).unwrap_err();
        assert!(matches!(err, PackageError::MissingResource(p) if p == missing));
        let err = archive.add_file("gone.txt", &missing).unwrap_err();
        assert!(matches!(err, PackageError::MissingResource(_)));
    }

    #[test]
    fn test_duplicate_file_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = ArchiveWriter::create(&dir.path().join("out.vdb")).unwrap();
        archive.add_bytes("a.txt", b"a").unwrap();

        let err = archive.add_bytes("a.txt", b"b").unwrap_err();
        assert!(matches!(err, PackageError::DuplicateEntry(name) if name == "a.txt"));
    }

    #[test]
    fn test_repeated_directory_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.vdb");
        let mut archive = ArchiveWriter::create(&path).unwrap();
        archive.add_directory("META-INF").unwrap();
        archive.add_directory("META-INF/").unwrap();
        assert_eq!(archive.finish().unwrap(), vec!["META-INF/"]);
        assert_eq!(read_entries(&path), vec!["META-INF/"]);
    }
}
