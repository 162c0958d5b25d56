//! Detached aggregate persistence.
//!
//! Work with entity graphs outside any live tracking session: load a root
//! with its owned and associated children as one unit, mutate the detached
//! graph freely, then merge it back against the persisted version in a
//! single transactional update.
//!
//! # Role In The Architecture
//!
//! - **Include-path resolver**: computes the navigation paths a root query
//!   must eager-load to assemble a complete aggregate.
//! - **Query manager**: fetches persisted roots by key, filter, or page,
//!   always with the resolved includes applied.
//! - **Merge engine**: diffs a detached graph against its persisted
//!   counterpart and stages the minimal insert/update/delete/link batch.
//! - **Detached context**: the façade wiring those around one store
//!   session and its unit of work.
//!
//! # Example
//!
//! ```ignore
//! let mut schema = Schema::new();
//! schema.register::<User>();
//! schema.register::<Role>();
//!
//! let mut context = DetachedContext::new(schema, store);
//!
//! // Load a complete aggregate, detach it, edit it anywhere.
//! let mut user: User = context.load(&cx, &[Value::BigInt(1)]).await?.unwrap();
//! user.name = "New Name".into();
//! user.roles.retain(|r| r.name != "viewer");
//!
//! // Merge the detached graph back and commit in one unit.
//! context.update(&cx, &user).await?;
//! let affected = context.save(&cx).await?;
//! ```

pub mod context;
pub mod include;
pub mod merge;
pub mod query;
pub mod unit_of_work;

pub use context::DetachedContext;
pub use include::{IncludePath, resolve_path_strings, resolve_paths};
pub use merge::MergeEngine;
pub use query::QueryManager;
pub use unit_of_work::{PendingCounts, UnitOfWork};

pub use detached_core::{
    Cardinality, Cx, Entity, EntityNode, EntityType, Error, Filter, LinkTableInfo, NavigationInfo,
    Outcome, Ownership, Page, PageRequest, Result, Schema, StagedOp, Store, Value,
};
