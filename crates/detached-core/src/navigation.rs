//! Navigation metadata.
//!
//! Navigations are defined at compile-time as static metadata on each
//! `Entity`. This lets the include-path resolver and the merge engine walk
//! an aggregate's shape without runtime reflection.

/// Whether a navigation target's lifecycle is bound to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Lifecycle bound to the parent: deep-included and cascade-deleted.
    Owned,
    /// Independently persisted: included one level, referenced by key,
    /// never cascade-deleted.
    Associated,
}

/// Whether a navigation holds one target or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Single-valued navigation (`Option<Child>`).
    Single,
    /// Collection-valued navigation (`Vec<Child>`).
    Collection,
}

/// Information about a link/join table for many-to-many navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTableInfo {
    /// The link table name (e.g., `"user_roles"`).
    pub table_name: &'static str,

    /// Column in the link table pointing to the local entity (e.g., `"user_id"`).
    pub local_column: &'static str,

    /// Column in the link table pointing to the remote entity (e.g., `"role_id"`).
    pub remote_column: &'static str,
}

impl LinkTableInfo {
    /// Create a new link-table definition.
    #[must_use]
    pub const fn new(
        table_name: &'static str,
        local_column: &'static str,
        remote_column: &'static str,
    ) -> Self {
        Self {
            table_name,
            local_column,
            remote_column,
        }
    }
}

/// Metadata about one navigation between entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationInfo {
    /// Name of the navigation field.
    pub name: &'static str,

    /// The target entity type's name.
    pub target: &'static str,

    /// Whether the target is owned or associated.
    pub ownership: Ownership,

    /// Whether the navigation is single- or collection-valued.
    pub cardinality: Cardinality,

    /// Link table for many-to-many associated collections.
    pub link_table: Option<LinkTableInfo>,
}

impl NavigationInfo {
    /// An owned single-valued navigation.
    #[must_use]
    pub const fn owned(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            ownership: Ownership::Owned,
            cardinality: Cardinality::Single,
            link_table: None,
        }
    }

    /// An owned collection navigation.
    #[must_use]
    pub const fn owned_many(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            ownership: Ownership::Owned,
            cardinality: Cardinality::Collection,
            link_table: None,
        }
    }

    /// An associated single-valued navigation (reference by key).
    #[must_use]
    pub const fn associated(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            ownership: Ownership::Associated,
            cardinality: Cardinality::Single,
            link_table: None,
        }
    }

    /// An associated many-to-many collection navigation through a link table.
    #[must_use]
    pub const fn many_to_many(
        name: &'static str,
        target: &'static str,
        link_table: LinkTableInfo,
    ) -> Self {
        Self {
            name,
            target,
            ownership: Ownership::Associated,
            cardinality: Cardinality::Collection,
            link_table: Some(link_table),
        }
    }

    /// Whether this navigation's target is owned by the parent.
    #[must_use]
    pub const fn is_owned(&self) -> bool {
        matches!(self.ownership, Ownership::Owned)
    }

    /// Whether this navigation's target is an associated entity.
    #[must_use]
    pub const fn is_associated(&self) -> bool {
        matches!(self.ownership, Ownership::Associated)
    }

    /// Whether this navigation holds a collection.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.cardinality, Cardinality::Collection)
    }

    /// Whether this navigation is a many-to-many association.
    #[must_use]
    pub const fn is_many_to_many(&self) -> bool {
        self.link_table.is_some()
    }
}
