use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SchemaError};
use crate::types::AttrType;

/// One attribute declaration in a [`TypeMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttrType,
}

/// Ordered attribute name → type tag table for one record type.
///
/// Declaration order is significant: bulk set and parse apply known
/// attributes in this order. Serializes as an array of `{name, type}`
/// entries so a schema can be loaded from configuration; duplicates are
/// rejected on load exactly as they are in the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeMap {
    entries: Vec<TypeEntry>,
}

impl TypeMap {
    pub fn builder() -> TypeMapBuilder {
        TypeMapBuilder::default()
    }

    /// Build from pre-assembled entries, rejecting duplicate names.
    pub fn from_entries(entries: Vec<TypeEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name.as_str()) {
                return Err(SchemaError::DuplicateAttribute(entry.name.clone()));
            }
        }
        Ok(TypeMap { entries })
    }

    /// Tag declared for `name`, if any.
    pub fn get(&self, name: &str) -> Option<AttrType> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.attr_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }

    /// Entries whose tag routes values to a nested instance.
    pub fn nested(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter().filter(|entry| entry.attr_type.is_nested())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for TypeMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<TypeEntry>::deserialize(deserializer)?;
        TypeMap::from_entries(entries).map_err(D::Error::custom)
    }
}

/// Chained declaration of a [`TypeMap`].
#[derive(Debug, Default)]
pub struct TypeMapBuilder {
    entries: Vec<TypeEntry>,
}

impl TypeMapBuilder {
    pub fn attr(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.entries.push(TypeEntry {
            name: name.into(),
            attr_type,
        });
        self
    }

    pub fn build(self) -> Result<TypeMap> {
        TypeMap::from_entries(self.entries)
    }
}
