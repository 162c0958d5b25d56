//! Core types and traits for detached aggregate persistence.
//!
//! This crate provides the foundational abstractions the `detached` crate
//! builds on:
//!
//! - `Entity` trait and `EntityNode` graph values
//! - `Schema`/`EntityType` runtime descriptors
//! - `NavigationInfo` relationship metadata
//! - `Store` trait for the persistence-engine boundary
//! - `Cx`/`Outcome` re-exports from asupersync for cancel-correct operations

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod entity;
pub mod error;
pub mod field;
pub mod navigation;
pub mod schema;
pub mod store;
pub mod value;

pub use entity::{Entity, EntityNode};
pub use error::{ConfigError, DataError, Error, Result, StoreError, StoreErrorKind};
pub use field::FieldInfo;
pub use navigation::{Cardinality, LinkTableInfo, NavigationInfo, Ownership};
pub use schema::{EntityType, Schema};
pub use store::{Filter, Page, PageRequest, StagedOp, Store, compare_values};
pub use value::{Value, hash_values};
