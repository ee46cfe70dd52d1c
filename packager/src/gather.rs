//! Resource gathering.
//!
//! [`gather`] lazily walks one resource root and yields every file and
//! directory below it, named relative to the root with `/` separators.
//! Anything whose file name ends with the descriptor suffix (`vdb.xml`) is
//! skipped, including the contents of such a directory. [`EntrySet`] unions
//! several roots, keeping the first source for each entry name.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use vdb_core::DESCRIPTOR_SUFFIX;
use walkdir::WalkDir;

use crate::error::{PackageError, Result};

/// Whether a gathered entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One filesystem entry slated for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatheredEntry {
    /// Archive-relative name, `/`-separated, without a trailing slash.
    pub name: String,
    /// Location on disk.
    pub source: PathBuf,
    pub kind: EntryKind,
}

/// Returns `true` for file names that are never archived verbatim.
///
/// # Examples
///
/// ```
/// use vdb_packager::is_descriptor_file;
///
/// assert!(is_descriptor_file("vdb.xml"));
/// assert!(is_descriptor_file("portfolio-vdb.xml"));
/// assert!(!is_descriptor_file("schema.ddl"));
/// ```
pub fn is_descriptor_file(file_name: &str) -> bool {
    file_name.ends_with(DESCRIPTOR_SUFFIX)
}

/// Converts a relative path into a `/`-separated archive entry name.
pub fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Walks `root` and yields its entries in file-name order.
///
/// The iterator is restartable by calling `gather` again; it holds no state
/// beyond the underlying directory walk.
pub fn gather(root: &Path) -> impl Iterator<Item = Result<GatheredEntry>> + use<> {
    let root = root.to_path_buf();
    WalkDir::new(&root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry
                .file_name()
                .to_str()
                .is_some_and(is_descriptor_file)
        })
        .map(move |entry| {
            let entry = entry.map_err(|err| {
                PackageError::io(
                    format!("failed to walk {}", root.display()),
                    std::io::Error::from(err),
                )
            })?;
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            Ok(GatheredEntry {
                name: entry_name(relative),
                source: entry.path().to_path_buf(),
                kind,
            })
        })
}

/// Ordered, deduplicated set of gathered entries keyed by entry name.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use vdb_packager::{EntryKind, EntrySet, GatheredEntry};
///
/// let mut set = EntrySet::new();
/// let entry = |source: &str| GatheredEntry {
///     name: "schema.ddl".into(),
///     source: PathBuf::from(source),
///     kind: EntryKind::File,
/// };
/// assert!(set.insert(entry("a/schema.ddl")));
/// assert!(!set.insert(entry("b/schema.ddl")));
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntrySet {
    entries: Vec<GatheredEntry>,
    names: HashSet<String>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry unless its name is already present.
    pub fn insert(&mut self, entry: GatheredEntry) -> bool {
        if !self.names.insert(entry.name.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Gathers `root` into the set and returns how many entries were new.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] if the directory walk fails.
    pub fn add_root(&mut self, root: &Path) -> Result<usize> {
        let mut added = 0;
        for entry in gather(root) {
            let entry = entry?;
            let name = entry.name.clone();
            if self.insert(entry) {
                added += 1;
            } else {
                debug!(entry = %name, root = %root.display(), "Skipping duplicate entry");
            }
        }
        Ok(added)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GatheredEntry> {
        self.entries.iter()
    }

    /// Entry names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_gather_lists_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("schemas/a.ddl"), "a");
        write(&dir.path().join("b.txt"), "b");

        let names: Vec<_> = gather(dir.path())
            .map(|e| e.unwrap())
            .map(|e| (e.name, e.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("b.txt".to_string(), EntryKind::File),
                ("schemas".to_string(), EntryKind::Directory),
                ("schemas/a.ddl".to_string(), EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_gather_skips_descriptor_files() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("META-INF/vdb.xml"), "<vdb/>");
        write(&dir.path().join("META-INF/other.xml"), "x");
        write(&dir.path().join("portfolio-vdb.xml"), "<vdb/>");

        let names: Vec<_> = gather(dir.path()).map(|e| e.unwrap().name).collect();
        assert_eq!(names, vec!["META-INF", "META-INF/other.xml"]);
    }

    #[test]
    fn test_gather_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("x/y.txt"), "y");

        let first: Vec<_> = gather(dir.path()).map(|e| e.unwrap()).collect();
        let second: Vec<_> = gather(dir.path()).map(|e| e.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_entry_set_first_root_wins() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        write(&a.path().join("shared.txt"), "a");
        write(&b.path().join("shared.txt"), "b");
        write(&b.path().join("only-b.txt"), "b");

        let mut set = EntrySet::new();
        assert_eq!(set.add_root(a.path()).unwrap(), 1);
        assert_eq!(set.add_root(b.path()).unwrap(), 1);
        assert_eq!(set.names(), vec!["shared.txt", "only-b.txt"]);

        let shared = set.iter().find(|e| e.name == "shared.txt").unwrap();
        assert_eq!(shared.source, a.path().join("shared.txt"));
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let path: PathBuf = ["a", "b", "c.txt"].iter().collect();
        assert_eq!(entry_name(&path), "a/b/c.txt");
    }
}
