//! Descriptor type definitions for virtual database modeling.
//!
//! This module defines the in-memory form of a VDB descriptor. Only the
//! fields the packager needs for import merging carry meaning here (names,
//! versions, visibility, translator overrides and data policies); everything
//! else is carried along so the descriptor round-trips through
//! [`parse_descriptor`](crate::parse_descriptor) and
//! [`serialize_descriptor`](crate::serialize_descriptor).
//!
//! Keyed collections use [`BTreeMap`] so serialized output is stable across
//! runs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Archive entry name of the standard descriptor.
pub const DESCRIPTOR_ENTRY: &str = "META-INF/vdb.xml";

/// Archive entry name of the flat DDL descriptor.
pub const DDL_DESCRIPTOR_ENTRY: &str = "META-INF/vdb.ddl";

/// File name suffix reserved for descriptor files.
///
/// Matches both `META-INF/vdb.xml` and `portfolio-vdb.xml`; such files are
/// never copied verbatim into an archive because the merged descriptor is
/// written explicitly.
pub const DESCRIPTOR_SUFFIX: &str = "vdb.xml";

/// Suffix of the parent property that pins a model's visibility.
pub const VISIBLE_PROPERTY_SUFFIX: &str = ".visible";

/// Model kind as declared in the descriptor.
///
/// # Examples
///
/// ```
/// use vdb_core::ModelType;
///
/// assert_eq!(ModelType::default(), ModelType::Physical);
/// assert_eq!(ModelType::parse("virtual"), ModelType::Virtual);
/// assert_eq!(ModelType::Virtual.as_str(), "VIRTUAL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ModelType {
    /// Backed by one or more physical sources (the default).
    #[default]
    Physical,
    /// Defined purely in terms of other models.
    Virtual,
    /// Any other declared type, preserved verbatim.
    Other(String),
}

impl ModelType {
    /// Parses a declared model type, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("PHYSICAL") {
            Self::Physical
        } else if raw.eq_ignore_ascii_case("VIRTUAL") {
            Self::Virtual
        } else {
            Self::Other(raw.to_string())
        }
    }

    /// Returns the serialized form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Physical => "PHYSICAL",
            Self::Virtual => "VIRTUAL",
            Self::Other(raw) => raw,
        }
    }
}

/// Declared dependency on another VDB, matched by name and version.
///
/// # Examples
///
/// ```
/// use vdb_core::Import;
///
/// let import = Import::new("libX", "1.0").with_data_policies();
/// assert!(import.import_data_policies);
/// assert!(import.matches("libX", "1.0"));
/// assert!(!import.matches("libX", "2.0"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Name of the imported VDB.
    pub name: String,
    /// Version of the imported VDB.
    pub version: String,
    /// Whether the imported VDB's data policies are merged as well.
    pub import_data_policies: bool,
}

impl Import {
    /// Creates an import that does not carry data policies.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            import_data_policies: false,
        }
    }

    /// Enables data policy import.
    pub fn with_data_policies(mut self) -> Self {
        self.import_data_policies = true;
        self
    }

    /// Returns `true` if this import refers to `name` at exactly `version`.
    pub fn matches(&self, name: &str, version: &str) -> bool {
        self.name == name && self.version == version
    }
}

/// Physical source binding of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSource {
    pub name: String,
    pub translator_name: Option<String>,
    pub connection_jndi_name: Option<String>,
}

/// Opaque schema text attached to a model (DDL, index files, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataBlock {
    /// Declared metadata type, e.g. `DDL`.
    pub kind: String,
    pub text: String,
}

/// A named schema unit owned by one descriptor.
///
/// # Examples
///
/// ```
/// use vdb_core::{ModelMetadata, ModelType};
///
/// let model = ModelMetadata::new("Accounts").with_type(ModelType::Virtual);
/// assert_eq!(model.name, "Accounts");
/// assert!(model.visible);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    pub model_type: ModelType,
    pub description: Option<String>,
    /// Visibility declared on the model itself.
    pub visible: bool,
    pub properties: BTreeMap<String, String>,
    pub sources: Vec<ModelSource>,
    pub metadata: Vec<MetadataBlock>,
}

impl ModelMetadata {
    /// Creates a visible physical model with no sources.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_type: ModelType::Physical,
            description: None,
            visible: true,
            properties: BTreeMap::new(),
            sources: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Sets the model type.
    pub fn with_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    /// Adds a source binding.
    pub fn with_source(mut self, source: ModelSource) -> Self {
        self.sources.push(source);
        self
    }
}

/// Named substitution for a data-source translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorOverride {
    pub name: String,
    /// Base translator being overridden.
    pub translator_type: String,
    pub description: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl TranslatorOverride {
    pub fn new(name: impl Into<String>, translator_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translator_type: translator_type.into(),
            description: None,
            properties: BTreeMap::new(),
        }
    }
}

/// Resource permission inside a data policy.
///
/// `allows` maps the permission kind (`read`, `create`, `update`, ...) to
/// its declared value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub resource_name: String,
    pub allows: BTreeMap<String, bool>,
}

/// Named access-control role.
///
/// A `grant_all` policy grants access to every schema in `schemas`; when it
/// is imported from another VDB the schema set is replaced by the imported
/// VDB's model names.
///
/// # Examples
///
/// ```
/// use vdb_core::DataPolicy;
///
/// let policy = DataPolicy::new("admin").grant_all();
/// assert!(policy.grant_all);
/// assert!(policy.schemas.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPolicy {
    pub name: String,
    pub description: Option<String>,
    pub grant_all: bool,
    pub any_authenticated: bool,
    pub allow_create_temporary_tables: bool,
    /// Schema names this policy grants access to.
    pub schemas: BTreeSet<String>,
    pub permissions: Vec<Permission>,
    pub mapped_role_names: Vec<String>,
}

impl DataPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            grant_all: false,
            any_authenticated: false,
            allow_create_temporary_tables: false,
            schemas: BTreeSet::new(),
            permissions: Vec::new(),
            mapped_role_names: Vec::new(),
        }
    }

    /// Marks the policy as granting access to every schema.
    pub fn grant_all(mut self) -> Self {
        self.grant_all = true;
        self
    }

    /// Adds a schema name to the policy.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schemas.insert(schema.into());
        self
    }
}

/// In-memory VDB descriptor.
///
/// Identity is the `(name, version)` pair, which is what imports match on.
///
/// # Examples
///
/// ```
/// use vdb_core::{Import, ModelMetadata, VdbDescriptor};
///
/// let mut vdb = VdbDescriptor::new("Portfolio", "1");
/// vdb.imports.push(Import::new("libX", "1.0"));
/// vdb.add_model(ModelMetadata::new("Accounts"));
/// vdb.properties.insert("Accounts.visible".into(), "false".into());
///
/// assert!(vdb.has_imports());
/// assert_eq!(vdb.explicit_visibility("Accounts"), Some(false));
/// assert_eq!(vdb.model_names(), vec!["Accounts".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdbDescriptor {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub properties: BTreeMap<String, String>,
    /// Unresolved imports, in declaration order.
    pub imports: Vec<Import>,
    pub models: BTreeMap<String, ModelMetadata>,
    /// Per-resource visibility, overriding the model's own flag.
    pub visibility_overrides: BTreeMap<String, bool>,
    pub translator_overrides: BTreeMap<String, TranslatorOverride>,
    pub data_policies: BTreeMap<String, DataPolicy>,
}

impl VdbDescriptor {
    /// Creates an empty descriptor with the given identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            properties: BTreeMap::new(),
            imports: Vec::new(),
            models: BTreeMap::new(),
            visibility_overrides: BTreeMap::new(),
            translator_overrides: BTreeMap::new(),
            data_policies: BTreeMap::new(),
        }
    }

    /// Returns `name@version`, used in messages.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Returns `true` if any import is still declared.
    pub fn has_imports(&self) -> bool {
        !self.imports.is_empty()
    }

    /// Inserts a model, returning the one it replaced.
    pub fn add_model(&mut self, model: ModelMetadata) -> Option<ModelMetadata> {
        self.models.insert(model.name.clone(), model)
    }

    /// Inserts a data policy, returning the one it replaced.
    pub fn add_data_policy(&mut self, policy: DataPolicy) -> Option<DataPolicy> {
        self.data_policies.insert(policy.name.clone(), policy)
    }

    /// Inserts a translator override, returning the one it replaced.
    pub fn add_translator_override(
        &mut self,
        translator: TranslatorOverride,
    ) -> Option<TranslatorOverride> {
        self.translator_overrides
            .insert(translator.name.clone(), translator)
    }

    /// Model names in sorted order.
    pub fn model_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Visibility pinned by a `<model>.visible` property, if any.
    ///
    /// Values other than `true`/`false` (case-insensitive) count as `false`.
    pub fn explicit_visibility(&self, model: &str) -> Option<bool> {
        self.properties
            .get(&format!("{model}{VISIBLE_PROPERTY_SUFFIX}"))
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
    }

    /// Effective visibility of a model: override first, then the model flag.
    pub fn is_visible(&self, model: &str) -> Option<bool> {
        self.visibility_overrides
            .get(model)
            .copied()
            .or_else(|| self.models.get(model).map(|m| m.visible))
    }

    /// Finds the first unresolved import matching `name` and `version`.
    pub fn find_import(&self, name: &str, version: &str) -> Option<&Import> {
        self.imports.iter().find(|i| i.matches(name, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_preserves_unknown_kind() {
        let kind = ModelType::parse("FUNCTION");
        assert_eq!(kind, ModelType::Other("FUNCTION".into()));
        assert_eq!(kind.as_str(), "FUNCTION");
    }

    #[test]
    fn test_is_visible_prefers_override() {
        let mut vdb = VdbDescriptor::new("v", "1");
        vdb.add_model(ModelMetadata::new("m"));
        assert_eq!(vdb.is_visible("m"), Some(true));

        vdb.visibility_overrides.insert("m".into(), false);
        assert_eq!(vdb.is_visible("m"), Some(false));
        assert_eq!(vdb.is_visible("missing"), None);
    }

    #[test]
    fn test_explicit_visibility_parses_property() {
        let mut vdb = VdbDescriptor::new("v", "1");
        vdb.properties.insert("m.visible".into(), " TRUE ".into());
        vdb.properties.insert("n.visible".into(), "nope".into());
        assert_eq!(vdb.explicit_visibility("m"), Some(true));
        assert_eq!(vdb.explicit_visibility("n"), Some(false));
        assert_eq!(vdb.explicit_visibility("o"), None);
    }

    #[test]
    fn test_descriptor_json_shape() {
        let mut vdb = VdbDescriptor::new("v", "1");
        vdb.add_model(ModelMetadata::new("m").with_type(ModelType::Virtual));
        let json = serde_json::to_value(&vdb).unwrap();
        assert_eq!(json["name"], "v");
        assert_eq!(json["models"]["m"]["model_type"], "Virtual");

        let back: VdbDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, vdb);
    }

    #[test]
    fn test_find_import_requires_exact_version() {
        let mut vdb = VdbDescriptor::new("v", "1");
        vdb.imports.push(Import::new("lib", "1.0"));
        assert!(vdb.find_import("lib", "1.0").is_some());
        assert!(vdb.find_import("lib", "1").is_none());
    }
}
