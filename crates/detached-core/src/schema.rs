//! Runtime schema model.
//!
//! `EntityType` descriptors are built once when the schema is assembled
//! from each entity's static metadata and are read-only for the process
//! lifetime. The include-path resolver and merge engine borrow them and
//! resolve navigation targets by name through the `Schema` registry.

use crate::entity::{Entity, EntityNode};
use crate::error::{Error, Result};
use crate::field::FieldInfo;
use crate::navigation::NavigationInfo;
use crate::value::Value;
use std::collections::HashMap;

/// Runtime descriptor of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityType {
    /// The entity type's name.
    pub name: &'static str,
    /// The backend table name.
    pub table: &'static str,
    /// Key column name(s).
    pub key: &'static [&'static str],
    /// Scalar field metadata.
    pub fields: &'static [FieldInfo],
    /// Navigation metadata.
    pub navigations: &'static [NavigationInfo],
}

impl EntityType {
    /// Look up a navigation by name.
    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&NavigationInfo> {
        self.navigations.iter().find(|nav| nav.name == name)
    }

    /// Extract a node's key values for this type.
    #[must_use]
    pub fn key_of(&self, node: &EntityNode) -> Vec<Value> {
        node.key_values(self.key)
    }

    /// Whether a node carries a fully non-null key for this type.
    #[must_use]
    pub fn has_key(&self, node: &EntityNode) -> bool {
        node.has_key(self.key)
    }
}

/// Registry mapping entity type names to their descriptors.
///
/// Built once at startup; navigation targets are resolved against it during
/// include-path resolution and graph merging.
#[derive(Debug, Default)]
pub struct Schema {
    types: HashMap<&'static str, EntityType>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type from its static metadata.
    ///
    /// Re-registering a name replaces the previous descriptor.
    pub fn register<T: Entity>(&mut self) {
        let descriptor = EntityType {
            name: T::TYPE_NAME,
            table: T::TABLE_NAME,
            key: T::KEY,
            fields: T::fields(),
            navigations: T::NAVIGATIONS,
        };
        if self.types.insert(T::TYPE_NAME, descriptor).is_some() {
            tracing::warn!(entity = T::TYPE_NAME, "entity type re-registered");
        }
    }

    /// Look up an entity type by name.
    #[must_use]
    pub fn entity_type(&self, name: &str) -> Option<&EntityType> {
        self.types.get(name)
    }

    /// Look up an entity type by name, failing with a configuration error.
    pub fn require(&self, name: &str) -> Result<&EntityType> {
        self.entity_type(name)
            .ok_or_else(|| Error::config(format!("{name} is not a valid entity type")))
    }

    /// Look up the descriptor for a Rust entity type.
    pub fn entity_type_of<T: Entity>(&self) -> Result<&EntityType> {
        self.require(T::TYPE_NAME)
    }

    /// Number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no entity types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
