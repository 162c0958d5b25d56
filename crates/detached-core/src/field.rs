//! Scalar field definitions.

/// Metadata about an entity scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Backend column name (may differ from field name)
    pub column_name: &'static str,
    /// Whether this field is part of the key
    pub key: bool,
    /// Whether this field is nullable
    pub nullable: bool,
}

impl FieldInfo {
    /// Create a new field info with minimal required data.
    #[must_use]
    pub const fn new(name: &'static str, column_name: &'static str) -> Self {
        Self {
            name,
            column_name,
            key: false,
            nullable: false,
        }
    }

    /// Mark this field as part of the key.
    #[must_use]
    pub const fn key(mut self, value: bool) -> Self {
        self.key = value;
        self
    }

    /// Mark this field as nullable.
    #[must_use]
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }
}
