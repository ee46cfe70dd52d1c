//! Import merging for VDB descriptors.
//!
//! [`merge_import`] folds one imported (child) descriptor into the importing
//! (parent) descriptor. It consumes both values and returns the merged
//! parent, so a packaging run is a plain fold over the matched dependencies
//! in scan order:
//!
//! ```
//! use vdb_core::*;
//!
//! let mut parent = VdbDescriptor::new("Portfolio", "1");
//! parent.imports.push(Import::new("libX", "1.0").with_data_policies());
//!
//! let mut child = VdbDescriptor::new("libX", "1.0");
//! child.add_model(ModelMetadata::new("M1"));
//! child.add_data_policy(DataPolicy::new("reader").grant_all());
//!
//! let import = parent.imports[0].clone();
//! let merged = merge_import(parent, child, &import).unwrap();
//!
//! assert!(merged.imports.is_empty());
//! assert!(merged.models.contains_key("M1"));
//! assert!(merged.data_policies["reader"].schemas.contains("M1"));
//! ```
//!
//! Visibility and translator overrides use last-writer-wins: a later child
//! replaces an entry written by the parent or an earlier child. The parent's
//! own `<model>.visible` property always beats an imported value.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{Import, VdbDescriptor};

/// Fatal conflicts raised while merging an imported descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The imported descriptor declares imports of its own.
    #[error("imported VDB {child} declares its own imports; only one level of imports is supported")]
    NestedImport { child: String },

    /// Parent and child both define a data policy with the same name.
    #[error("data policy '{policy}' from imported VDB {child} conflicts with a policy already defined in {parent}")]
    ConflictingPolicy {
        parent: String,
        child: String,
        policy: String,
    },
}

/// Rejects descriptors that cannot be imported.
///
/// Only one level of imports is supported, so an imported descriptor must
/// not declare imports itself.
pub fn check_importable(child: &VdbDescriptor) -> Result<(), MergeError> {
    if child.has_imports() {
        return Err(MergeError::NestedImport {
            child: child.identity(),
        });
    }
    Ok(())
}

/// Merges `child` into `parent` under the given `import` declaration.
///
/// Models move from the child into the parent, replacing a parent model of
/// the same name. Data policies are merged only
/// when `import.import_data_policies` is set; a `grant_all` policy has its
/// schema set replaced by the child's model names. The first parent import
/// equal to `import` is removed to mark it resolved.
///
/// # Errors
///
/// - [`MergeError::NestedImport`] if the child declares imports.
/// - [`MergeError::ConflictingPolicy`] if a policy name already exists in the
///   parent.
pub fn merge_import(
    mut parent: VdbDescriptor,
    child: VdbDescriptor,
    import: &Import,
) -> Result<VdbDescriptor, MergeError> {
    check_importable(&child)?;

    let parent_id = parent.identity();
    let child_id = child.identity();
    let child_models: BTreeSet<String> = child.models.keys().cloned().collect();

    parent
        .visibility_overrides
        .extend(child.visibility_overrides);

    for (name, model) in child.models {
        if let Some(visible) = parent.explicit_visibility(&name) {
            parent.visibility_overrides.insert(name.clone(), visible);
        }
        parent.models.insert(name, model);
    }

    parent
        .translator_overrides
        .extend(child.translator_overrides);

    if import.import_data_policies {
        for (name, mut policy) in child.data_policies {
            if parent.data_policies.contains_key(&name) {
                return Err(MergeError::ConflictingPolicy {
                    parent: parent_id,
                    child: child_id,
                    policy: name,
                });
            }
            if policy.grant_all {
                policy.schemas = child_models.clone();
            }
            parent.data_policies.insert(name, policy);
        }
    }

    if let Some(pos) = parent.imports.iter().position(|i| i == import) {
        parent.imports.remove(pos);
    }

    Ok(parent)
}
