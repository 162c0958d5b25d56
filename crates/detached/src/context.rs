//! The detached context façade.
//!
//! Coordinates the query manager and the merge engine around one store
//! session: load a persisted root with all its includes, reconcile a
//! detached graph against it, and commit the staged batch atomically on
//! save.

use crate::merge::MergeEngine;
use crate::query::QueryManager;
use crate::unit_of_work::{PendingCounts, UnitOfWork};
use asupersync::{Cx, Outcome};
use detached_core::entity::Entity;
use detached_core::error::Error;
use detached_core::schema::Schema;
use detached_core::store::{Filter, Page, PageRequest, Store};
use detached_core::value::Value;

/// Coordinates detached aggregate operations over one store session.
///
/// One context wraps exactly one session and one unit of work; it is not
/// safe for concurrent use — serialize calls per instance or use one
/// instance per logical operation. Staged changes are discardable until
/// `save` commits them.
pub struct DetachedContext<S: Store> {
    schema: Schema,
    store: S,
    uow: UnitOfWork,
}

impl<S: Store> DetachedContext<S> {
    /// Create a context over a schema and a store session.
    pub fn new(schema: Schema, store: S) -> Self {
        Self {
            schema,
            store,
            uow: UnitOfWork::new(),
        }
    }

    /// The schema this context resolves entity types against.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The underlying store session.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Counts of staged, not-yet-saved operations.
    #[must_use]
    pub fn pending(&self) -> PendingCounts {
        self.uow.counts()
    }

    /// Discard all staged operations without saving.
    pub fn discard(&mut self) {
        self.uow.clear();
    }

    /// Load one root by key, with its complete aggregate hydrated.
    pub async fn load<T: Entity>(&mut self, cx: &Cx, key: &[Value]) -> Outcome<Option<T>, Error> {
        let ty = match self.schema.entity_type_of::<T>() {
            Ok(ty) => ty,
            Err(e) => return Outcome::Err(e),
        };

        let queries = QueryManager::new(&self.schema);
        match queries.find_by_key(cx, &self.store, ty, key).await {
            Outcome::Ok(Some(node)) => match T::from_node(&node) {
                Ok(root) => Outcome::Ok(Some(root)),
                Err(e) => Outcome::Err(e),
            },
            Outcome::Ok(None) => Outcome::Ok(None),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Load every root matching a filter.
    pub async fn load_where<T: Entity>(
        &mut self,
        cx: &Cx,
        filter: &Filter,
    ) -> Outcome<Vec<T>, Error> {
        let ty = match self.schema.entity_type_of::<T>() {
            Ok(ty) => ty,
            Err(e) => return Outcome::Err(e),
        };

        let queries = QueryManager::new(&self.schema);
        match queries.find_where(cx, &self.store, ty, filter).await {
            Outcome::Ok(nodes) => {
                let mut roots = Vec::with_capacity(nodes.len());
                for node in &nodes {
                    match T::from_node(node) {
                        Ok(root) => roots.push(root),
                        Err(e) => return Outcome::Err(e),
                    }
                }
                Outcome::Ok(roots)
            }
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Load one page of roots.
    pub async fn load_page<T: Entity>(
        &mut self,
        cx: &Cx,
        request: &PageRequest,
    ) -> Outcome<Page<T>, Error> {
        let ty = match self.schema.entity_type_of::<T>() {
            Ok(ty) => ty,
            Err(e) => return Outcome::Err(e),
        };

        let queries = QueryManager::new(&self.schema);
        match queries.get_page(cx, &self.store, ty, request).await {
            Outcome::Ok(page) => match page.try_map(|node| T::from_node(&node)) {
                Ok(page) => Outcome::Ok(page),
                Err(e) => Outcome::Err(e),
            },
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Merge a detached root against its persisted counterpart.
    ///
    /// Loads the persisted graph with all includes; if it does not exist
    /// the whole detached graph is staged for insertion, otherwise the two
    /// graphs are reconciled. Returns the persisted state after the merge.
    /// Nothing reaches storage until `save`.
    #[tracing::instrument(level = "debug", skip(self, cx, root), fields(entity = T::TYPE_NAME))]
    pub async fn update<T: Entity>(&mut self, cx: &Cx, root: &T) -> Outcome<T, Error> {
        // Suspend the backend's implicit change detection while the merge
        // engine performs an explicit diff; restore the prior value after.
        let auto_detect = self.store.auto_detect_changes();
        self.store.set_auto_detect_changes(false);

        let result = self.update_inner::<T>(cx, root).await;

        self.store.set_auto_detect_changes(auto_detect);
        result
    }

    async fn update_inner<T: Entity>(&mut self, cx: &Cx, root: &T) -> Outcome<T, Error> {
        let ty = match self.schema.entity_type_of::<T>() {
            Ok(ty) => ty,
            Err(e) => return Outcome::Err(e),
        };
        let detached = root.to_node();

        let queries = QueryManager::new(&self.schema);
        let persisted = match queries.find_persisted(cx, &self.store, ty, &detached).await {
            Outcome::Ok(persisted) => persisted,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let engine = MergeEngine::new(&self.schema);
        let reconciled = match persisted {
            Some(persisted) => {
                tracing::debug!(entity = ty.name, "merging against persisted counterpart");
                match engine.merge(ty, &detached, &persisted, &mut self.uow) {
                    Ok(node) => node,
                    Err(e) => return Outcome::Err(e),
                }
            }
            None => {
                tracing::debug!(entity = ty.name, "no persisted counterpart, staging add");
                match engine.add(ty, &detached, &mut self.uow) {
                    Ok(()) => detached,
                    Err(e) => return Outcome::Err(e),
                }
            }
        };

        match T::from_node(&reconciled) {
            Ok(root) => Outcome::Ok(root),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Stage deletion of a detached root's persisted counterpart.
    ///
    /// Cascades through owned children and drops link rows; associated
    /// entities stay in storage. Deleting an absent root is a no-op.
    #[tracing::instrument(level = "debug", skip(self, cx, root), fields(entity = T::TYPE_NAME))]
    pub async fn delete<T: Entity>(&mut self, cx: &Cx, root: &T) -> Outcome<(), Error> {
        self.store.set_auto_detect_changes(false);

        let detached = root.to_node();
        let result = self.delete_inner::<T>(cx, DeleteTarget::Detached(&detached)).await;

        self.store.set_auto_detect_changes(true);
        result
    }

    /// Stage deletion of the persisted root with the given key.
    #[tracing::instrument(level = "debug", skip(self, cx, key), fields(entity = T::TYPE_NAME))]
    pub async fn delete_by_key<T: Entity>(&mut self, cx: &Cx, key: &[Value]) -> Outcome<(), Error> {
        self.store.set_auto_detect_changes(false);

        let result = self.delete_inner::<T>(cx, DeleteTarget::Key(key)).await;

        self.store.set_auto_detect_changes(true);
        result
    }

    async fn delete_inner<T: Entity>(
        &mut self,
        cx: &Cx,
        target: DeleteTarget<'_>,
    ) -> Outcome<(), Error> {
        let ty = match self.schema.entity_type_of::<T>() {
            Ok(ty) => ty,
            Err(e) => return Outcome::Err(e),
        };

        let queries = QueryManager::new(&self.schema);
        let lookup = match target {
            DeleteTarget::Detached(node) => queries.find_persisted(cx, &self.store, ty, node).await,
            DeleteTarget::Key(key) => queries.find_by_key(cx, &self.store, ty, key).await,
        };

        let persisted = match lookup {
            Outcome::Ok(persisted) => persisted,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        if let Some(persisted) = persisted {
            let engine = MergeEngine::new(&self.schema);
            if let Err(e) = engine.delete(ty, &persisted, &mut self.uow) {
                return Outcome::Err(e);
            }
        }

        Outcome::Ok(())
    }

    /// Apply all staged operations atomically and return the affected-row
    /// count.
    ///
    /// Staged operations are kept on failure so the caller can retry or
    /// discard. Change detection is force-enabled afterwards regardless of
    /// its prior state — the restore asymmetry is inherited behavior, kept
    /// deliberately.
    #[tracing::instrument(level = "info", skip(self, cx))]
    pub async fn save(&mut self, cx: &Cx) -> Outcome<u64, Error> {
        self.store.set_auto_detect_changes(false);

        let counts = self.uow.counts();
        tracing::info!(
            inserts = counts.inserts,
            updates = counts.updates,
            deletes = counts.deletes,
            links = counts.links,
            "applying staged operations"
        );

        let ops = self.uow.ops().to_vec();
        let result = self.store.apply(cx, ops).await;

        self.store.set_auto_detect_changes(true);

        if let Outcome::Ok(affected) = &result {
            tracing::info!(affected, "save complete");
            self.uow.clear();
        }
        result
    }
}

enum DeleteTarget<'a> {
    Detached(&'a detached_core::entity::EntityNode),
    Key(&'a [Value]),
}
