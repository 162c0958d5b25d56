//! Root queries.
//!
//! A root is an entity with its owned and associated children loaded as a
//! single unit. Every query here resolves the aggregate's include paths
//! first and hands them to the store, so the fetched graph is always
//! complete.

use crate::include::resolve_path_strings;
use asupersync::{Cx, Outcome};
use detached_core::entity::EntityNode;
use detached_core::error::Error;
use detached_core::schema::{EntityType, Schema};
use detached_core::store::{Filter, Page, PageRequest, Store};
use detached_core::value::Value;

/// Builds and runs queries that fetch complete roots.
pub struct QueryManager<'s> {
    schema: &'s Schema,
}

impl<'s> QueryManager<'s> {
    /// Create a query manager over a schema.
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Fetch one root by key. Not-found is `None`, never an error.
    pub async fn find_by_key<S: Store>(
        &self,
        cx: &Cx,
        store: &S,
        ty: &EntityType,
        key: &[Value],
    ) -> Outcome<Option<EntityNode>, Error> {
        if key.len() != ty.key.len() {
            return Outcome::Err(Error::config(format!(
                "{}: key mismatch, expected {} value(s), got {}",
                ty.name,
                ty.key.len(),
                key.len()
            )));
        }

        let includes = match resolve_path_strings(self.schema, ty) {
            Ok(includes) => includes,
            Err(e) => return Outcome::Err(e),
        };

        store.fetch_by_key(cx, ty, &includes, key).await
    }

    /// Fetch every root matching a filter.
    pub async fn find_where<S: Store>(
        &self,
        cx: &Cx,
        store: &S,
        ty: &EntityType,
        filter: &Filter,
    ) -> Outcome<Vec<EntityNode>, Error> {
        let includes = match resolve_path_strings(self.schema, ty) {
            Ok(includes) => includes,
            Err(e) => return Outcome::Err(e),
        };

        store.fetch_where(cx, ty, &includes, filter).await
    }

    /// Fetch one page of roots.
    pub async fn get_page<S: Store>(
        &self,
        cx: &Cx,
        store: &S,
        ty: &EntityType,
        request: &PageRequest,
    ) -> Outcome<Page<EntityNode>, Error> {
        let includes = match resolve_path_strings(self.schema, ty) {
            Ok(includes) => includes,
            Err(e) => return Outcome::Err(e),
        };

        store.fetch_page(cx, ty, &includes, request).await
    }

    /// Fetch the persisted counterpart of a detached root.
    ///
    /// A detached root without a complete key has no counterpart yet and
    /// short-circuits to `None` without touching the store.
    pub async fn find_persisted<S: Store>(
        &self,
        cx: &Cx,
        store: &S,
        ty: &EntityType,
        detached: &EntityNode,
    ) -> Outcome<Option<EntityNode>, Error> {
        if !ty.has_key(detached) {
            tracing::debug!(entity = ty.name, "detached root has no key, skipping lookup");
            return Outcome::Ok(None);
        }

        self.find_by_key(cx, store, ty, &ty.key_of(detached)).await
    }
}
