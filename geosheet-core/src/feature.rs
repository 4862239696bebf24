//! Feature records, schemas, and properties.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::attributes::AttributeKind;

/// Stable feature identifier.
///
/// Derived deterministically from row data by an identity rule, so the
/// same row always reconciles against the same stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureId(String);

impl FeatureId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named attribute value of a feature being written.
///
/// A property with an empty name and a null value is a sentinel no-op
/// entry: it must be excluded before an update is issued and never reach
/// the store as a modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Attribute name
    pub name: String,
    /// Attribute value
    pub value: JsonValue,
}

impl Property {
    /// Named property.
    pub fn new(name: impl Into<String>, value: JsonValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// The sentinel no-op entry (empty name, null value).
    #[must_use]
    pub fn sentinel() -> Self {
        Self {
            name: String::new(),
            value: JsonValue::Null,
        }
    }

    /// True for the sentinel no-op entry.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.name.is_empty() && self.value.is_null()
    }
}

/// The named/typed shape every feature produced from one table shares.
///
/// Derived once per processing run; structurally stable for the lifetime
/// of that run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    type_name: String,
    fields: IndexMap<String, AttributeKind>,
}

impl FeatureSchema {
    /// Schema for `type_name` with the given ordered fields.
    pub fn new(type_name: impl Into<String>, fields: IndexMap<String, AttributeKind>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Feature type (table) name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Ordered attribute name to kind mapping.
    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, AttributeKind> {
        &self.fields
    }

    /// Kind of the field `name`, if the schema has it.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.fields.get(name).copied()
    }
}

/// One typed feature record: identifier plus named attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    id: FeatureId,
    type_name: String,
    properties: Vec<Property>,
}

impl Feature {
    /// Feature of `type_name` with the given identifier and properties.
    pub fn new(id: FeatureId, type_name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            properties,
        }
    }

    /// Stable identifier of the feature.
    #[must_use]
    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    /// Feature type (table) name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Properties in attribute order.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Value of property `name`, if present.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&JsonValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Append a property.
    pub fn push_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Set property `name`, replacing an existing value or appending.
    pub fn set_value(&mut self, name: &str, value: JsonValue) {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(property) => property.value = value,
            None => self.properties.push(Property::new(name, value)),
        }
    }
}
