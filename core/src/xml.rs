//! XML codec for VDB descriptors.
//!
//! The document is read into a small element tree with `quick-xml`'s event
//! reader and then mapped onto [`VdbDescriptor`]. Unknown elements and
//! attributes are ignored. Text content is trimmed.
//!
//! ```
//! use vdb_core::{parse_descriptor, serialize_descriptor};
//!
//! let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
//! <vdb name="Portfolio" version="1">
//!     <import-vdb name="libX" version="1.0" import-data-policies="true"/>
//!     <model name="Accounts" type="VIRTUAL"/>
//! </vdb>"#;
//!
//! let vdb = parse_descriptor(xml.as_bytes()).unwrap();
//! assert_eq!(vdb.identity(), "Portfolio@1");
//! assert!(vdb.imports[0].import_data_policies);
//!
//! let bytes = serialize_descriptor(&vdb).unwrap();
//! assert_eq!(parse_descriptor(&bytes).unwrap(), vdb);
//! ```

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

use crate::{
    DataPolicy, Import, MetadataBlock, ModelMetadata, ModelSource, ModelType, Permission,
    TranslatorOverride, VdbDescriptor,
};

/// Errors raised while reading or writing a descriptor document.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// Malformed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Writer I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid UTF-8.
    #[error("descriptor is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Document has no root element.
    #[error("descriptor document is empty")]
    Empty,

    /// Root element is not `<vdb>`.
    #[error("expected <vdb> root element, found <{0}>")]
    UnexpectedRoot(String),

    /// Element was never closed.
    #[error("unclosed element <{0}>")]
    Unclosed(String),

    /// Required attribute missing.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    /// Attribute or element value could not be interpreted.
    #[error("<{element}> has invalid value '{value}' for '{attribute}'")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
    },
}

/// Convenience alias for results with [`DescriptorError`].
pub type Result<T> = std::result::Result<T, DescriptorError>;

const ROOT: &str = "vdb";
const DEFAULT_VERSION: &str = "1";

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.push((key.to_string(), value.into()));
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| DescriptorError::MissingAttribute {
                element: self.name.clone(),
                attribute: key.to_string(),
            })
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            Some(raw) => parse_bool(&self.name, key, raw),
            None => Ok(default),
        }
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.children_named(name).next().map(|c| c.text.clone())
    }
}

fn parse_bool(element: &str, attribute: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(DescriptorError::InvalidValue {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(&String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn read_tree(bytes: &[u8]) -> Result<Element> {
    let source = std::str::from_utf8(bytes)?;
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(std::str::from_utf8(&data)?.trim());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(DescriptorError::Unclosed(open.name));
    }
    root.ok_or(DescriptorError::Empty)
}

fn read_properties(element: &Element) -> Result<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();
    for property in element.children_named("property") {
        let name = property.require("name")?;
        let value = property.get("value").unwrap_or_default().to_string();
        properties.insert(name, value);
    }
    Ok(properties)
}

fn read_model(element: &Element) -> Result<ModelMetadata> {
    let mut model = ModelMetadata::new(element.require("name")?);
    if let Some(kind) = element.get("type") {
        model.model_type = ModelType::parse(kind);
    }
    model.visible = element.flag("visible", true)?;
    model.description = element.child_text("description");
    model.properties = read_properties(element)?;
    for source in element.children_named("source") {
        model.sources.push(ModelSource {
            name: source.require("name")?,
            translator_name: source.get("translator-name").map(str::to_string),
            connection_jndi_name: source.get("connection-jndi-name").map(str::to_string),
        });
    }
    for block in element.children_named("metadata") {
        model.metadata.push(MetadataBlock {
            kind: block.get("type").unwrap_or("DDL").to_string(),
            text: block.text.clone(),
        });
    }
    Ok(model)
}

fn read_translator(element: &Element) -> Result<TranslatorOverride> {
    let mut translator = TranslatorOverride::new(element.require("name")?, element.require("type")?);
    translator.description = element.get("description").map(str::to_string);
    translator.properties = read_properties(element)?;
    Ok(translator)
}

fn read_policy(element: &Element) -> Result<DataPolicy> {
    let mut policy = DataPolicy::new(element.require("name")?);
    policy.grant_all = element.flag("grant-all", false)?;
    policy.any_authenticated = element.flag("any-authenticated", false)?;
    policy.allow_create_temporary_tables =
        element.flag("allow-create-temporary-tables", false)?;
    policy.description = element.child_text("description");

    for child in &element.children {
        match child.name.as_str() {
            "schema" => {
                policy.schemas.insert(child.text.clone());
            }
            "mapped-role-name" => policy.mapped_role_names.push(child.text.clone()),
            "permission" => {
                let mut permission = Permission::default();
                for item in &child.children {
                    if item.name == "resource-name" {
                        permission.resource_name = item.text.clone();
                    } else if let Some(kind) = item.name.strip_prefix("allow-") {
                        let allowed = parse_bool(&item.name, "value", &item.text)?;
                        permission.allows.insert(kind.to_string(), allowed);
                    }
                }
                policy.permissions.push(permission);
            }
            _ => {}
        }
    }
    Ok(policy)
}

fn read_descriptor(root: &Element) -> Result<VdbDescriptor> {
    if root.name != ROOT {
        return Err(DescriptorError::UnexpectedRoot(root.name.clone()));
    }

    let mut vdb = VdbDescriptor::new(
        root.require("name")?,
        root.get("version").unwrap_or(DEFAULT_VERSION),
    );
    vdb.description = root.child_text("description");
    vdb.properties = read_properties(root)?;

    for child in &root.children {
        match child.name.as_str() {
            "import-vdb" => {
                let mut import = Import::new(child.require("name")?, child.require("version")?);
                import.import_data_policies = child.flag("import-data-policies", true)?;
                vdb.imports.push(import);
            }
            "model" => {
                vdb.add_model(read_model(child)?);
            }
            "translator" => {
                vdb.add_translator_override(read_translator(child)?);
            }
            "data-role" => {
                vdb.add_data_policy(read_policy(child)?);
            }
            "visibility-override" => {
                let visible = child.flag("visible", true)?;
                vdb.visibility_overrides
                    .insert(child.require("name")?, visible);
            }
            _ => {}
        }
    }
    Ok(vdb)
}

/// Parses descriptor XML.
///
/// # Errors
///
/// Returns [`DescriptorError`] for malformed XML, a root other than
/// `<vdb>`, missing `name` attributes, or boolean values other than
/// `true`/`false`.
pub fn parse_descriptor(bytes: &[u8]) -> Result<VdbDescriptor> {
    let root = read_tree(bytes)?;
    read_descriptor(&root)
}

fn properties_elements(properties: &BTreeMap<String, String>) -> Vec<Element> {
    properties
        .iter()
        .map(|(name, value)| {
            Element::new("property")
                .attr("name", name.as_str())
                .attr("value", value.as_str())
        })
        .collect()
}

fn model_element(model: &ModelMetadata) -> Element {
    let mut element = Element::new("model")
        .attr("name", model.name.as_str())
        .attr("type", model.model_type.as_str())
        .attr("visible", model.visible.to_string());
    if let Some(description) = &model.description {
        element = element.child(Element::new("description").text(description.as_str()));
    }
    element.children.extend(properties_elements(&model.properties));
    for source in &model.sources {
        let mut child = Element::new("source").attr("name", source.name.as_str());
        if let Some(translator) = &source.translator_name {
            child = child.attr("translator-name", translator.as_str());
        }
        if let Some(jndi) = &source.connection_jndi_name {
            child = child.attr("connection-jndi-name", jndi.as_str());
        }
        element = element.child(child);
    }
    for block in &model.metadata {
        element = element.child(
            Element::new("metadata")
                .attr("type", block.kind.as_str())
                .text(block.text.as_str()),
        );
    }
    element
}

fn translator_element(translator: &TranslatorOverride) -> Element {
    let mut element = Element::new("translator")
        .attr("name", translator.name.as_str())
        .attr("type", translator.translator_type.as_str());
    if let Some(description) = &translator.description {
        element = element.attr("description", description.as_str());
    }
    element.children.extend(properties_elements(&translator.properties));
    element
}

fn policy_element(policy: &DataPolicy) -> Element {
    let mut element = Element::new("data-role")
        .attr("name", policy.name.as_str())
        .attr("grant-all", policy.grant_all.to_string())
        .attr("any-authenticated", policy.any_authenticated.to_string())
        .attr(
            "allow-create-temporary-tables",
            policy.allow_create_temporary_tables.to_string(),
        );
    if let Some(description) = &policy.description {
        element = element.child(Element::new("description").text(description.as_str()));
    }
    for schema in &policy.schemas {
        element = element.child(Element::new("schema").text(schema.as_str()));
    }
    for permission in &policy.permissions {
        let mut child = Element::new("permission")
            .child(Element::new("resource-name").text(permission.resource_name.as_str()));
        for (kind, allowed) in &permission.allows {
            child = child.child(Element::new(&format!("allow-{kind}")).text(allowed.to_string()));
        }
        element = element.child(child);
    }
    for role in &policy.mapped_role_names {
        element = element.child(Element::new("mapped-role-name").text(role.as_str()));
    }
    element
}

fn descriptor_element(vdb: &VdbDescriptor) -> Element {
    let mut root = Element::new(ROOT)
        .attr("name", vdb.name.as_str())
        .attr("version", vdb.version.as_str());
    if let Some(description) = &vdb.description {
        root = root.child(Element::new("description").text(description.as_str()));
    }
    root.children.extend(properties_elements(&vdb.properties));
    for import in &vdb.imports {
        root = root.child(
            Element::new("import-vdb")
                .attr("name", import.name.as_str())
                .attr("version", import.version.as_str())
                .attr(
                    "import-data-policies",
                    import.import_data_policies.to_string(),
                ),
        );
    }
    root.children.extend(vdb.models.values().map(model_element));
    root.children
        .extend(vdb.translator_overrides.values().map(translator_element));
    root.children.extend(vdb.data_policies.values().map(policy_element));
    for (name, visible) in &vdb.visibility_overrides {
        root = root.child(
            Element::new("visibility-override")
                .attr("name", name.as_str())
                .attr("visible", visible.to_string()),
        );
    }
    root
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Serializes a descriptor to indented XML.
///
/// Output is deterministic: keyed collections are written in name order.
///
/// # Errors
///
/// Returns [`DescriptorError::Io`] or [`DescriptorError::Xml`] if the writer
/// fails, which does not happen for in-memory output in practice.
pub fn serialize_descriptor(vdb: &VdbDescriptor) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    write_element(&mut writer, &descriptor_element(vdb))?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}
