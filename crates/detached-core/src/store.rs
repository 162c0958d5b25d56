//! Storage collaborator boundary.
//!
//! The core does not talk SQL: it hands the backend resolved include paths,
//! filters, and staged operations, and the backend owns query execution and
//! the enclosing transaction. All storage round-trips take a `Cx` context
//! and return `Outcome` for cancel-correct operation.

use crate::entity::EntityNode;
use crate::error::Error;
use crate::schema::EntityType;
use crate::value::Value;
use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::Future;

/// A staged operation queued against the unit of work.
///
/// Operations are produced by the merge engine and applied atomically by
/// the store on save.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedOp {
    /// Insert a new row.
    Insert {
        /// Table name.
        table: String,
        /// Column names.
        columns: Vec<String>,
        /// Values to insert.
        values: Vec<Value>,
    },
    /// Update an existing row (only changed columns).
    Update {
        /// Table name.
        table: String,
        /// Key column names.
        key_columns: Vec<String>,
        /// Key values.
        key_values: Vec<Value>,
        /// Columns to update.
        set_columns: Vec<String>,
        /// New values for the changed columns.
        set_values: Vec<Value>,
    },
    /// Delete an existing row.
    Delete {
        /// Table name.
        table: String,
        /// Key column names.
        key_columns: Vec<String>,
        /// Key values.
        key_values: Vec<Value>,
    },
    /// Insert a many-to-many link row.
    Link {
        /// Link table name.
        table: String,
        /// Local (parent) column name.
        local_column: String,
        /// Local (parent) key value.
        local_value: Value,
        /// Remote (associated) column name.
        remote_column: String,
        /// Remote (associated) key value.
        remote_value: Value,
    },
    /// Delete a many-to-many link row.
    Unlink {
        /// Link table name.
        table: String,
        /// Local (parent) column name.
        local_column: String,
        /// Local (parent) key value.
        local_value: Value,
        /// Remote (associated) column name.
        remote_column: String,
        /// Remote (associated) key value.
        remote_value: Value,
    },
}

impl StagedOp {
    /// Get the table name for this operation.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            StagedOp::Insert { table, .. }
            | StagedOp::Update { table, .. }
            | StagedOp::Delete { table, .. }
            | StagedOp::Link { table, .. }
            | StagedOp::Unlink { table, .. } => table,
        }
    }

    /// Check if this is an insert operation.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, StagedOp::Insert { .. })
    }

    /// Check if this is an update operation.
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, StagedOp::Update { .. })
    }

    /// Check if this is a delete operation.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self, StagedOp::Delete { .. })
    }

    /// Check if this is a link-row operation (either direction).
    #[must_use]
    pub fn is_link_op(&self) -> bool {
        matches!(self, StagedOp::Link { .. } | StagedOp::Unlink { .. })
    }
}

/// A predicate over entity scalars, evaluated by the store.
///
/// This is the load-by-filter surface: a small expression tree the backend
/// translates to its own query language (or evaluates in memory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Match every row.
    All,
    /// Field equals value.
    Eq(String, Value),
    /// Field does not equal value.
    Ne(String, Value),
    /// Field is greater than value.
    Gt(String, Value),
    /// Field is less than value.
    Lt(String, Value),
    /// All sub-filters match.
    And(Vec<Filter>),
    /// Any sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    /// Field-equals shorthand.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    /// Field-not-equals shorthand.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    /// Field-greater-than shorthand.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt(field.into(), value.into())
    }

    /// Field-less-than shorthand.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    /// Evaluate this filter against a node's scalars.
    ///
    /// In-memory reference semantics; SQL-translating backends must match
    /// them. A missing field reads as NULL, and NULL never compares true.
    #[must_use]
    pub fn matches(&self, node: &EntityNode) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => node.get_scalar(field) == Some(value),
            Filter::Ne(field, value) => {
                node.get_scalar(field).is_some_and(|v| !v.is_null() && v != value)
            }
            Filter::Gt(field, value) => {
                node.get_scalar(field)
                    .and_then(|v| compare_values(v, value))
                    == Some(Ordering::Greater)
            }
            Filter::Lt(field, value) => {
                node.get_scalar(field)
                    .and_then(|v| compare_values(v, value))
                    == Some(Ordering::Less)
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(node)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(node)),
        }
    }
}

/// Compare two scalar values for ordering purposes.
///
/// Numeric variants compare numerically across widths; text, bytes, and
/// timestamps compare within their own variant; everything else is
/// unordered.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        _ => {
            let x = a.as_f64()?;
            let y = b.as_f64()?;
            x.partial_cmp(&y)
        }
    }
}

/// A request for one page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page index.
    pub page: usize,
    /// Page size.
    pub size: usize,
    /// Field to order by (backend default order when unset).
    pub order_by: Option<String>,
    /// Whether the ordering is descending.
    pub descending: bool,
}

impl PageRequest {
    /// Create a request for the given page and size.
    #[must_use]
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page: page.max(1),
            size,
            order_by: None,
            descending: false,
        }
    }

    /// Order results by a field (builder).
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Make the ordering descending (builder).
    #[must_use]
    pub fn descending(mut self, value: bool) -> Self {
        self.descending = value;
        self
    }

    /// Number of rows to skip for this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.size
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The rows of this page.
    pub items: Vec<T>,
    /// 1-based page index.
    pub page: usize,
    /// Requested page size.
    pub size: usize,
    /// Total matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` rows at this page size.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size as u64)
    }

    /// Map the page items, preserving paging metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<_, E>>()?;
        Ok(Page {
            items,
            page: self.page,
            size: self.size,
            total: self.total,
        })
    }
}

/// The persistence-engine session this layer orchestrates.
///
/// One store instance represents one session/transaction scope: fetches
/// read through it and `apply` commits a batch of staged operations
/// atomically, returning the affected-row count. The change-detection
/// toggle exists so the façade can suspend the backend's implicit diffing
/// while the merge engine performs an explicit one; implementations back it
/// with interior mutability.
pub trait Store: Send + Sync {
    /// Fetch one root by key, hydrating the given include paths.
    fn fetch_by_key(
        &self,
        cx: &Cx,
        ty: &EntityType,
        includes: &[String],
        key: &[Value],
    ) -> impl Future<Output = Outcome<Option<EntityNode>, Error>> + Send;

    /// Fetch every root matching a filter, hydrating the include paths.
    fn fetch_where(
        &self,
        cx: &Cx,
        ty: &EntityType,
        includes: &[String],
        filter: &Filter,
    ) -> impl Future<Output = Outcome<Vec<EntityNode>, Error>> + Send;

    /// Fetch one page of roots, hydrating the include paths.
    fn fetch_page(
        &self,
        cx: &Cx,
        ty: &EntityType,
        includes: &[String],
        request: &PageRequest,
    ) -> impl Future<Output = Outcome<Page<EntityNode>, Error>> + Send;

    /// Apply a batch of staged operations atomically.
    ///
    /// Returns the affected-row count. Order is meaningful: callers stage
    /// parent-first inserts and child-first deletes.
    fn apply(
        &self,
        cx: &Cx,
        ops: Vec<StagedOp>,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Whether the session's automatic change detection is enabled.
    fn auto_detect_changes(&self) -> bool;

    /// Enable or disable the session's automatic change detection.
    fn set_auto_detect_changes(&self, enabled: bool);
}
