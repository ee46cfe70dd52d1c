//! Descriptor validation.
//!
//! Checks the invariants the import merger relies on: a descriptor has an
//! identity, map keys agree with the entries they hold, and no import is
//! declared twice.
//!
//! # Examples
//!
//! ```
//! use vdb_core::*;
//!
//! let mut vdb = VdbDescriptor::new("Portfolio", "1");
//! vdb.imports.push(Import::new("libX", "1.0"));
//! assert!(validate_descriptor(&vdb).is_empty());
//!
//! vdb.imports.push(Import::new("libX", "1.0"));
//! let errors = validate_descriptor(&vdb);
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateImport(_))));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::VdbDescriptor;

/// Descriptor validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Descriptor name is empty or whitespace-only.
    #[error("VDB name cannot be empty")]
    EmptyName,
    /// Descriptor version is empty or whitespace-only.
    #[error("VDB version cannot be empty")]
    EmptyVersion,
    /// The same `name@version` is imported more than once.
    #[error("duplicate import declaration: {0}")]
    DuplicateImport(String),
    /// The descriptor imports itself.
    #[error("VDB imports itself: {0}")]
    SelfImport(String),
    /// A model is stored under a key other than its own name.
    #[error("model '{model}' is registered under '{key}'")]
    ModelKeyMismatch { key: String, model: String },
    /// A data policy is stored under a key other than its own name.
    #[error("data policy '{policy}' is registered under '{key}'")]
    PolicyKeyMismatch { key: String, policy: String },
}

/// Validates a descriptor and returns every problem found.
pub fn validate_descriptor(vdb: &VdbDescriptor) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if vdb.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }
    if vdb.version.trim().is_empty() {
        errors.push(ValidationError::EmptyVersion);
    }

    let mut seen = HashSet::new();
    for import in &vdb.imports {
        let id = format!("{}@{}", import.name, import.version);
        if import.matches(&vdb.name, &vdb.version) {
            errors.push(ValidationError::SelfImport(id.clone()));
        }
        if !seen.insert(id.clone()) {
            errors.push(ValidationError::DuplicateImport(id));
        }
    }

    for (key, model) in &vdb.models {
        if key != &model.name {
            errors.push(ValidationError::ModelKeyMismatch {
                key: key.clone(),
                model: model.name.clone(),
            });
        }
    }
    for (key, policy) in &vdb.data_policies {
        if key != &policy.name {
            errors.push(ValidationError::PolicyKeyMismatch {
                key: key.clone(),
                policy: policy.name.clone(),
            });
        }
    }

    errors
}
