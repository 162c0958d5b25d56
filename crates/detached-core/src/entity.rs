//! Entity contract and the dynamic graph value.
//!
//! The `Entity` trait is the static contract a persisted type implements
//! (by hand or codegen): table/key metadata, navigation metadata, and the
//! conversion to/from `EntityNode`, the dynamic graph value the store
//! boundary and the merge engine operate on.

use crate::error::{DataError, Result};
use crate::field::FieldInfo;
use crate::navigation::NavigationInfo;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Trait for types that participate in detached aggregates.
///
/// # Example
///
/// ```ignore
/// struct User {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Entity for User {
///     const TYPE_NAME: &'static str = "User";
///     const TABLE_NAME: &'static str = "users";
///     const KEY: &'static [&'static str] = &["id"];
///     // ...
/// }
/// ```
pub trait Entity: Sized + Send + Sync {
    /// The entity type's name; schema lookups key on this.
    const TYPE_NAME: &'static str;

    /// The backend table name.
    const TABLE_NAME: &'static str;

    /// The key column name(s).
    const KEY: &'static [&'static str];

    /// Navigation metadata for this entity.
    ///
    /// Entities with no navigations can rely on the default empty slice.
    const NAVIGATIONS: &'static [NavigationInfo] = &[];

    /// Get field metadata for all scalar columns.
    fn fields() -> &'static [FieldInfo];

    /// Convert this instance (and its loaded sub-graph) to a graph node.
    fn to_node(&self) -> EntityNode;

    /// Construct an instance from a graph node.
    fn from_node(node: &EntityNode) -> Result<Self>;

    /// Get the value(s) of the key field(s).
    fn key_values(&self) -> Vec<Value>;
}

/// One node of a detached or persisted entity graph.
///
/// A node carries the entity type name, its scalar values, and its children
/// keyed by navigation name: single-valued navigations hold `Option` (an
/// explicit `None` means "the detached caller cleared this child"), and
/// collection navigations hold a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    type_name: String,
    scalars: Vec<(String, Value)>,
    singles: Vec<(String, Option<EntityNode>)>,
    collections: Vec<(String, Vec<EntityNode>)>,
}

impl EntityNode {
    /// Create an empty node for an entity type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            scalars: Vec::new(),
            singles: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Append a scalar value (builder).
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.scalars.push((name.into(), value.into()));
        self
    }

    /// Set a single-valued child (builder).
    #[must_use]
    pub fn single(mut self, navigation: impl Into<String>, child: Option<EntityNode>) -> Self {
        self.singles.push((navigation.into(), child));
        self
    }

    /// Set a collection of children (builder).
    #[must_use]
    pub fn collection(
        mut self,
        navigation: impl Into<String>,
        children: Vec<EntityNode>,
    ) -> Self {
        self.collections.push((navigation.into(), children));
        self
    }

    /// The entity type name this node was built for.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All scalar values in declaration order.
    #[must_use]
    pub fn scalars(&self) -> &[(String, Value)] {
        &self.scalars
    }

    /// Look up a scalar by field name.
    #[must_use]
    pub fn get_scalar(&self, name: &str) -> Option<&Value> {
        self.scalars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Look up a single-valued child by navigation name.
    ///
    /// Returns `None` when the navigation was never set on this node, which
    /// is distinct from `Some(None)` (explicitly cleared).
    #[must_use]
    pub fn get_single(&self, navigation: &str) -> Option<Option<&EntityNode>> {
        self.singles
            .iter()
            .find(|(n, _)| n == navigation)
            .map(|(_, child)| child.as_ref())
    }

    /// Look up a collection of children by navigation name.
    ///
    /// An unset collection navigation reads as empty.
    #[must_use]
    pub fn get_collection(&self, navigation: &str) -> &[EntityNode] {
        self.collections
            .iter()
            .find(|(n, _)| n == navigation)
            .map_or(&[], |(_, children)| children.as_slice())
    }

    /// Extract key values for the given key columns (missing scalars read
    /// as NULL).
    #[must_use]
    pub fn key_values(&self, key: &[&str]) -> Vec<Value> {
        key.iter()
            .map(|col| self.get_scalar(col).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Whether every key column carries a non-null value.
    #[must_use]
    pub fn has_key(&self, key: &[&str]) -> bool {
        !key.is_empty()
            && key
                .iter()
                .all(|col| self.get_scalar(col).is_some_and(|v| !v.is_null()))
    }

    /// Get a required i64 scalar, erroring on absence or type mismatch.
    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.require(name)?;
        value
            .as_i64()
            .ok_or_else(|| DataError::field("BIGINT", value.type_name(), name).into())
    }

    /// Get an optional i64 scalar (NULL and absent both read as `None`).
    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>> {
        match self.get_scalar(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| DataError::field("BIGINT", value.type_name(), name).into()),
        }
    }

    /// Get a required text scalar, erroring on absence or type mismatch.
    pub fn get_text(&self, name: &str) -> Result<String> {
        let value = self.require(name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DataError::field("TEXT", value.type_name(), name).into())
    }

    /// Get a required bool scalar, erroring on absence or type mismatch.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.require(name)?;
        value
            .as_bool()
            .ok_or_else(|| DataError::field("BOOLEAN", value.type_name(), name).into())
    }

    fn require(&self, name: &str) -> Result<&Value> {
        self.get_scalar(name)
            .ok_or_else(|| DataError::field("a value", "no field", name).into())
    }
}
