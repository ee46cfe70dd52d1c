//! Core descriptor types and import merging for virtual database archives.
//!
//! This crate defines the in-memory model of a VDB descriptor and the
//! operations the packager performs on it:
//!
//! - [`VdbDescriptor`]: identity, imports, models, visibility and translator
//!   overrides, and data policies.
//! - [`parse_descriptor`] / [`serialize_descriptor`]: the XML form stored
//!   at `META-INF/vdb.xml`.
//! - [`merge_import`]: folds an imported descriptor into the importing one,
//!   rejecting nested imports and conflicting policy names.
//! - [`validate_descriptor`]: structural checks run before merging.
//!
//! # Example
//!
//! ```
//! use vdb_core::*;
//!
//! let mut top = VdbDescriptor::new("Portfolio", "1");
//! top.imports.push(Import::new("libX", "1.0"));
//!
//! let mut lib = VdbDescriptor::new("libX", "1.0");
//! lib.add_model(ModelMetadata::new("M1"));
//!
//! let import = top.find_import(&lib.name, &lib.version).cloned().unwrap();
//! let merged = merge_import(top, lib, &import).unwrap();
//! assert!(!merged.has_imports());
//! assert!(validate_descriptor(&merged).is_empty());
//! ```

mod merge;
mod types;
mod validate;
mod xml;

pub use merge::{MergeError, check_importable, merge_import};
pub use types::*;
pub use validate::{ValidationError, validate_descriptor};
pub use xml::{DescriptorError, parse_descriptor, serialize_descriptor};
