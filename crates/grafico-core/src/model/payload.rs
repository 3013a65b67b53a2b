//! Opaque node payload, persisted verbatim.

use std::collections::BTreeMap;

use serde::Serialize;

use super::ModelError;

/// Attribute names owned by the file format itself.
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "id",
    "type",
    "name",
    "source",
    "target",
    "element",
    "relationship",
    "view",
];

/// User-defined key/value property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// Kind-specific scalar data of a node.
///
/// Attributes are kept sorted so that serialization is deterministic.
/// Properties keep their insertion order and may repeat keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Payload {
    name: Option<String>,
    documentation: Option<String>,
    attributes: BTreeMap<String, String>,
    properties: Vec<Property>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    /// Set the documentation text. Empty text clears it.
    pub fn set_documentation(&mut self, documentation: Option<String>) {
        self.documentation = documentation.filter(|text| !text.is_empty());
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.set_documentation(Some(documentation.into()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attributes in key order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, ModelError> {
        let key = key.into();
        validate_attribute_name(&key)?;
        Ok(self.attributes.insert(key, value.into()))
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.set_attribute(key, value)?;
        Ok(self)
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn push_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.push(Property {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_property(key, value);
        self
    }
}

/// Check that `name` can be written as a plain XML attribute.
pub fn validate_attribute_name(name: &str) -> Result<(), ModelError> {
    let reason = if RESERVED_ATTRIBUTES.contains(&name) {
        Some("reserved by the file format")
    } else if !is_xml_name(name) {
        Some("not a valid XML attribute name")
    } else if name.to_ascii_lowercase().starts_with("xml") {
        Some("names starting with 'xml' are reserved")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ModelError::InvalidAttribute {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
