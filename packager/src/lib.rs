//! Packaging of VDB projects into `.vdb` archives.
//!
//! This crate locates a project's descriptor, merges the VDBs it imports from
//! the build's dependency archives, gathers its resources and writes the
//! result as a ZIP container with the merged descriptor at
//! `META-INF/vdb.xml`.
//!
//! # Quick start
//!
//! ```no_run
//! use vdb_packager::{DependencyArtifact, PackagerConfig, StaticBuildContext, package_vdb};
//!
//! let config = PackagerConfig::load("vdb-package.yaml")
//!     .unwrap()
//!     .resolve_against("/work/portfolio");
//! let ctx = StaticBuildContext::new()
//!     .with_dependency(DependencyArtifact::parse("libx=deps/libx-1.0.vdb"));
//!
//! let outcome = package_vdb(&config, &ctx).unwrap();
//! println!("wrote {}", outcome.archive.display());
//! for import in outcome.unresolved_imports() {
//!     println!("unresolved: {}@{}", import.name, import.version);
//! }
//! ```

mod archive;
mod config;
mod context;
mod error;
mod gather;
mod imports;
mod inspect;
mod locate;
mod package;
mod unpack;

pub use archive::ArchiveWriter;
pub use config::PackagerConfig;
pub use context::{BuildContext, DependencyArtifact, StaticBuildContext, is_vdb_archive};
pub use error::{PackageError, Result};
pub use gather::{EntryKind, EntrySet, GatheredEntry, entry_name, gather, is_descriptor_file};
pub use imports::{ImportResolution, MergedImport, resolve_imports};
pub use inspect::{EmbeddedDescriptor, read_embedded_descriptor};
pub use locate::{DescriptorSource, load_descriptor, locate_descriptor};
pub use package::{PackageOutcome, load_validated, merge_descriptor, package_vdb};
pub use unpack::{unpack, unpack_dir};
