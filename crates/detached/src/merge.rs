//! Graph merge engine.
//!
//! Reconciles a detached entity graph against its persisted counterpart,
//! staging the minimal set of inserts, updates, deletes, and link-row
//! operations on the unit of work. Nothing touches storage here; the
//! staged batch is applied atomically on save.

use crate::unit_of_work::UnitOfWork;
use detached_core::entity::EntityNode;
use detached_core::error::Result;
use detached_core::navigation::{Cardinality, LinkTableInfo, Ownership};
use detached_core::schema::{EntityType, Schema};
use detached_core::store::StagedOp;
use detached_core::value::{Value, hash_values};
use std::collections::{HashMap, HashSet};

/// Stages add/merge/delete operations for whole aggregates.
pub struct MergeEngine<'s> {
    schema: &'s Schema,
}

impl<'s> MergeEngine<'s> {
    /// Create a merge engine over a schema.
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Stage the entire detached sub-graph for insertion.
    ///
    /// The root row is staged first, then owned children recursively
    /// (parent-first insert order). Associated single references ride along
    /// in the root's foreign-key scalars; associated collections stage
    /// link rows only — the associated entities themselves are never
    /// inserted.
    pub fn add(&self, ty: &EntityType, detached: &EntityNode, uow: &mut UnitOfWork) -> Result<()> {
        self.stage_insert(ty, detached, uow);

        for nav in ty.navigations {
            let target = self.schema.require(nav.target)?;
            match (nav.ownership, nav.cardinality) {
                (Ownership::Owned, Cardinality::Single) => {
                    if let Some(child) = detached.get_single(nav.name).flatten() {
                        self.add(target, child, uow)?;
                    }
                }
                (Ownership::Owned, Cardinality::Collection) => {
                    for child in detached.get_collection(nav.name) {
                        self.add(target, child, uow)?;
                    }
                }
                (Ownership::Associated, Cardinality::Single) => {}
                (Ownership::Associated, Cardinality::Collection) => {
                    if let Some(link) = nav.link_table {
                        let local = first_key(ty, detached);
                        let mut seen = HashSet::new();
                        for child in detached.get_collection(nav.name) {
                            if seen.insert(hash_values(&target.key_of(child))) {
                                uow.stage(link_op(&link, &local, first_key(target, child), true));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Reconcile a detached graph against its persisted counterpart.
    ///
    /// Returns the reconciled graph (the persisted state with the detached
    /// values applied); the staged operations are the side channel that
    /// makes the reconciliation durable.
    ///
    /// Two detached children of one collection sharing a key resolve
    /// last-wins: each merges against the same persisted child and the
    /// later staged update prevails on apply.
    pub fn merge(
        &self,
        ty: &EntityType,
        detached: &EntityNode,
        persisted: &EntityNode,
        uow: &mut UnitOfWork,
    ) -> Result<EntityNode> {
        let mut merged = EntityNode::new(ty.name);

        // Scalars: key columns come from the persisted side; everything
        // else is overwritten by the detached value when one is provided,
        // and only the columns that actually changed are staged.
        let mut set_columns = Vec::new();
        let mut set_values = Vec::new();
        for field in ty.fields {
            let persisted_value = persisted.get_scalar(field.name);
            let value = if field.key {
                persisted_value.cloned().unwrap_or(Value::Null)
            } else {
                match detached.get_scalar(field.name) {
                    Some(detached_value) => {
                        if persisted_value != Some(detached_value) {
                            set_columns.push(column_for(ty, field.name));
                            set_values.push(detached_value.clone());
                        }
                        detached_value.clone()
                    }
                    None => persisted_value.cloned().unwrap_or(Value::Null),
                }
            };
            merged = merged.scalar(field.name.to_string(), value);
        }

        if !set_columns.is_empty() {
            tracing::debug!(
                entity = ty.name,
                columns = set_columns.len(),
                "staging scalar update"
            );
            uow.stage(StagedOp::Update {
                table: ty.table.to_string(),
                key_columns: key_columns(ty),
                key_values: ty.key_of(persisted),
                set_columns,
                set_values,
            });
        }

        for nav in ty.navigations {
            let target = self.schema.require(nav.target)?;
            match (nav.ownership, nav.cardinality) {
                (_, Cardinality::Single) => {
                    let detached_child = detached.get_single(nav.name).flatten();
                    let persisted_child = persisted.get_single(nav.name).flatten();
                    let merged_child = match (detached_child, persisted_child) {
                        (None, Some(pc)) => {
                            self.delete(target, pc, uow)?;
                            None
                        }
                        (Some(dc), None) => {
                            self.add(target, dc, uow)?;
                            Some(dc.clone())
                        }
                        (Some(dc), Some(pc)) => Some(self.merge(target, dc, pc, uow)?),
                        (None, None) => None,
                    };
                    merged = merged.single(nav.name.to_string(), merged_child);
                }
                (Ownership::Owned, Cardinality::Collection) => {
                    let children =
                        self.merge_owned_collection(target, detached, persisted, nav.name, uow)?;
                    merged = merged.collection(nav.name.to_string(), children);
                }
                (Ownership::Associated, Cardinality::Collection) => {
                    if let Some(link) = nav.link_table {
                        self.reconcile_links(
                            &link,
                            ty,
                            target,
                            detached.get_collection(nav.name),
                            persisted.get_collection(nav.name),
                            persisted,
                            uow,
                        );
                    }
                    // The detached side is the new link set; the entities
                    // themselves are independently persisted and untouched.
                    merged = merged.collection(
                        nav.name.to_string(),
                        detached.get_collection(nav.name).to_vec(),
                    );
                }
            }
        }

        Ok(merged)
    }

    /// Stage the persisted root and every owned descendant for removal.
    ///
    /// Children are staged before their parent (child-first delete order).
    /// Associated collections drop their link rows; associated entities
    /// and single references are left in storage.
    pub fn delete(
        &self,
        ty: &EntityType,
        persisted: &EntityNode,
        uow: &mut UnitOfWork,
    ) -> Result<()> {
        for nav in ty.navigations {
            let target = self.schema.require(nav.target)?;
            match (nav.ownership, nav.cardinality) {
                (Ownership::Owned, Cardinality::Single) => {
                    if let Some(child) = persisted.get_single(nav.name).flatten() {
                        self.delete(target, child, uow)?;
                    }
                }
                (Ownership::Owned, Cardinality::Collection) => {
                    for child in persisted.get_collection(nav.name) {
                        self.delete(target, child, uow)?;
                    }
                }
                (Ownership::Associated, Cardinality::Single) => {}
                (Ownership::Associated, Cardinality::Collection) => {
                    if let Some(link) = nav.link_table {
                        let local = first_key(ty, persisted);
                        let mut seen = HashSet::new();
                        for child in persisted.get_collection(nav.name) {
                            if seen.insert(hash_values(&target.key_of(child))) {
                                uow.stage(link_op(&link, &local, first_key(target, child), false));
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!(entity = ty.name, "staging delete");
        uow.stage(StagedOp::Delete {
            table: ty.table.to_string(),
            key_columns: key_columns(ty),
            key_values: ty.key_of(persisted),
        });

        Ok(())
    }

    fn merge_owned_collection(
        &self,
        target: &EntityType,
        detached: &EntityNode,
        persisted: &EntityNode,
        navigation: &str,
        uow: &mut UnitOfWork,
    ) -> Result<Vec<EntityNode>> {
        let persisted_children = persisted.get_collection(navigation);
        let persisted_by_key: HashMap<u64, &EntityNode> = persisted_children
            .iter()
            .map(|child| (hash_values(&target.key_of(child)), child))
            .collect();

        let mut matched = HashSet::new();
        let mut merged_children = Vec::new();

        for child in detached.get_collection(navigation) {
            if target.has_key(child) {
                let key = hash_values(&target.key_of(child));
                if let Some(persisted_child) = persisted_by_key.get(&key) {
                    matched.insert(key);
                    merged_children.push(self.merge(target, child, persisted_child, uow)?);
                    continue;
                }
            }
            self.add(target, child, uow)?;
            merged_children.push(child.clone());
        }

        for child in persisted_children {
            let key = hash_values(&target.key_of(child));
            if !matched.contains(&key) {
                self.delete(target, child, uow)?;
            }
        }

        Ok(merged_children)
    }

    /// Reconcile many-to-many link rows: detached-only keys insert a link,
    /// persisted-only keys delete one, matches are left untouched. The
    /// associated entities themselves are never staged.
    #[allow(clippy::too_many_arguments)]
    fn reconcile_links(
        &self,
        link: &LinkTableInfo,
        ty: &EntityType,
        target: &EntityType,
        detached_children: &[EntityNode],
        persisted_children: &[EntityNode],
        persisted_root: &EntityNode,
        uow: &mut UnitOfWork,
    ) {
        let detached_keys: HashSet<u64> = detached_children
            .iter()
            .map(|child| hash_values(&target.key_of(child)))
            .collect();
        let persisted_keys: HashSet<u64> = persisted_children
            .iter()
            .map(|child| hash_values(&target.key_of(child)))
            .collect();

        let local = first_key(ty, persisted_root);

        let mut staged = HashSet::new();
        for child in detached_children {
            let key = hash_values(&target.key_of(child));
            if !persisted_keys.contains(&key) && staged.insert(key) {
                tracing::debug!(entity = ty.name, link = link.table_name, "staging link insert");
                uow.stage(link_op(link, &local, first_key(target, child), true));
            }
        }
        for child in persisted_children {
            let key = hash_values(&target.key_of(child));
            if !detached_keys.contains(&key) && staged.insert(key) {
                tracing::debug!(entity = ty.name, link = link.table_name, "staging link delete");
                uow.stage(link_op(link, &local, first_key(target, child), false));
            }
        }
    }

    fn stage_insert(&self, ty: &EntityType, node: &EntityNode, uow: &mut UnitOfWork) {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for field in ty.fields {
            if let Some(value) = node.get_scalar(field.name) {
                // A null key is left for the backend to generate.
                if field.key && value.is_null() {
                    continue;
                }
                columns.push(column_for(ty, field.name));
                values.push(value.clone());
            }
        }

        tracing::debug!(entity = ty.name, columns = columns.len(), "staging insert");
        uow.stage(StagedOp::Insert {
            table: ty.table.to_string(),
            columns,
            values,
        });
    }
}

/// Map a field name to its backend column name.
fn column_for(ty: &EntityType, field: &str) -> String {
    ty.fields
        .iter()
        .find(|f| f.name == field)
        .map_or_else(|| field.to_string(), |f| f.column_name.to_string())
}

fn key_columns(ty: &EntityType) -> Vec<String> {
    ty.key.iter().map(|k| column_for(ty, k)).collect()
}

/// The first key value of a node (link rows carry single-column endpoints).
fn first_key(ty: &EntityType, node: &EntityNode) -> Value {
    ty.key_of(node).into_iter().next().unwrap_or(Value::Null)
}

fn link_op(link: &LinkTableInfo, local: &Value, remote: Value, insert: bool) -> StagedOp {
    if insert {
        StagedOp::Link {
            table: link.table_name.to_string(),
            local_column: link.local_column.to_string(),
            local_value: local.clone(),
            remote_column: link.remote_column.to_string(),
            remote_value: remote,
        }
    } else {
        StagedOp::Unlink {
            table: link.table_name.to_string(),
            local_column: link.local_column.to_string(),
            local_value: local.clone(),
            remote_column: link.remote_column.to_string(),
            remote_value: remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detached_core::entity::Entity;
    use detached_core::field::FieldInfo;
    use detached_core::navigation::NavigationInfo;

    macro_rules! fixture_entity {
        ($ty:ident, $name:literal, $table:literal, fields: $fields:expr, navs: $navs:expr) => {
            struct $ty;

            impl Entity for $ty {
                const TYPE_NAME: &'static str = $name;
                const TABLE_NAME: &'static str = $table;
                const KEY: &'static [&'static str] = &["id"];
                const NAVIGATIONS: &'static [NavigationInfo] = $navs;

                fn fields() -> &'static [FieldInfo] {
                    static FIELDS: &[FieldInfo] = $fields;
                    FIELDS
                }

                fn to_node(&self) -> EntityNode {
                    EntityNode::new(Self::TYPE_NAME)
                }

                fn from_node(_node: &EntityNode) -> detached_core::error::Result<Self> {
                    Ok(Self)
                }

                fn key_values(&self) -> Vec<Value> {
                    vec![]
                }
            }
        };
    }

    fixture_entity!(Role, "Role", "roles", fields: &[
        FieldInfo::new("id", "id").key(true),
        FieldInfo::new("name", "name"),
    ], navs: &[]);

    fixture_entity!(Profile, "Profile", "profiles", fields: &[
        FieldInfo::new("id", "id").key(true),
        FieldInfo::new("bio", "bio"),
    ], navs: &[]);

    fixture_entity!(Country, "Country", "countries", fields: &[
        FieldInfo::new("id", "id").key(true),
        FieldInfo::new("name", "name"),
    ], navs: &[]);

    fixture_entity!(OrderLine, "OrderLine", "order_lines", fields: &[
        FieldInfo::new("id", "id").key(true),
        FieldInfo::new("qty", "qty"),
    ], navs: &[]);

    fixture_entity!(User, "User", "users", fields: &[
        FieldInfo::new("id", "id").key(true),
        FieldInfo::new("name", "name"),
        FieldInfo::new("email", "email"),
    ], navs: &[
        NavigationInfo::owned("profile", "Profile"),
        NavigationInfo::associated("country", "Country"),
        NavigationInfo::owned_many("lines", "OrderLine"),
        NavigationInfo::many_to_many(
            "roles",
            "Role",
            LinkTableInfo::new("user_roles", "user_id", "role_id"),
        ),
    ]);

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.register::<Role>();
        schema.register::<Profile>();
        schema.register::<Country>();
        schema.register::<OrderLine>();
        schema.register::<User>();
        schema
    }

    fn role(id: i64, name: &str) -> EntityNode {
        EntityNode::new("Role").scalar("id", id).scalar("name", name)
    }

    fn line(id: i64, qty: i64) -> EntityNode {
        EntityNode::new("OrderLine").scalar("id", id).scalar("qty", qty)
    }

    fn user(id: i64, name: &str) -> EntityNode {
        EntityNode::new("User")
            .scalar("id", id)
            .scalar("name", name)
            .scalar("email", format!("{}@example.com", name.to_lowercase()))
    }

    fn merge_ops(detached: &EntityNode, persisted: &EntityNode) -> Vec<StagedOp> {
        let schema = schema();
        let engine = MergeEngine::new(&schema);
        let ty = schema.entity_type("User").unwrap();
        let mut uow = UnitOfWork::new();
        engine.merge(ty, detached, persisted, &mut uow).unwrap();
        uow.take()
    }

    #[test]
    fn identical_graphs_stage_nothing() {
        let persisted = user(1, "Ana")
            .single(
                "profile",
                Some(EntityNode::new("Profile").scalar("id", 7_i64).scalar("bio", "hi")),
            )
            .collection("lines", vec![line(1, 2)])
            .collection("roles", vec![role(1, "admin")]);
        let detached = persisted.clone();

        assert!(merge_ops(&detached, &persisted).is_empty());
    }

    #[test]
    fn scalar_diff_stages_only_changed_columns() {
        let persisted = user(1, "Ana");
        // Same email as persisted, different name.
        let detached = EntityNode::new("User")
            .scalar("id", 1_i64)
            .scalar("name", "Bea")
            .scalar("email", "ana@example.com");

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            StagedOp::Update {
                table,
                key_columns,
                key_values,
                set_columns,
                set_values,
            } => {
                assert_eq!(table, "users");
                assert_eq!(key_columns, &["id"]);
                assert_eq!(key_values, &[Value::BigInt(1)]);
                assert_eq!(set_columns, &["name"]);
                assert_eq!(set_values, &[Value::Text("Bea".into())]);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn omitted_scalar_keeps_persisted_value() {
        let persisted = user(1, "Ana");
        let detached = EntityNode::new("User").scalar("id", 1_i64).scalar("name", "Ana");

        let schema = schema();
        let engine = MergeEngine::new(&schema);
        let ty = schema.entity_type("User").unwrap();
        let mut uow = UnitOfWork::new();
        let merged = engine.merge(ty, &detached, &persisted, &mut uow).unwrap();

        assert!(!uow.has_changes());
        assert_eq!(
            merged.get_scalar("email"),
            Some(&Value::Text("ana@example.com".into()))
        );
    }

    #[test]
    fn owned_single_cleared_cascades_delete() {
        let persisted = user(1, "Ana").single(
            "profile",
            Some(EntityNode::new("Profile").scalar("id", 7_i64).scalar("bio", "hi")),
        );
        let detached = user(1, "Ana").single("profile", None);

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(ops.len(), 1);
        assert_eq!(
            ops[0],
            StagedOp::Delete {
                table: "profiles".into(),
                key_columns: vec!["id".into()],
                key_values: vec![Value::BigInt(7)],
            }
        );
    }

    #[test]
    fn owned_single_introduced_stages_add() {
        let persisted = user(1, "Ana");
        let detached = user(1, "Ana").single(
            "profile",
            Some(EntityNode::new("Profile").scalar("id", Value::Null).scalar("bio", "new")),
        );

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            StagedOp::Insert { table, columns, values } => {
                assert_eq!(table, "profiles");
                // Null key is left for the backend to generate.
                assert_eq!(columns, &["bio"]);
                assert_eq!(values, &[Value::Text("new".into())]);
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn owned_single_pair_merges_recursively() {
        let persisted = user(1, "Ana").single(
            "profile",
            Some(EntityNode::new("Profile").scalar("id", 7_i64).scalar("bio", "old")),
        );
        let detached = user(1, "Ana").single(
            "profile",
            Some(EntityNode::new("Profile").scalar("id", 7_i64).scalar("bio", "new")),
        );

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            StagedOp::Update { table, set_columns, set_values, .. } => {
                assert_eq!(table, "profiles");
                assert_eq!(set_columns, &["bio"]);
                assert_eq!(set_values, &[Value::Text("new".into())]);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn owned_collection_add_delete_symmetry() {
        // Persisted children {1,2,3}, detached {2,3,4}.
        let persisted = user(1, "Ana").collection("lines", vec![line(1, 1), line(2, 2), line(3, 3)]);
        let detached = user(1, "Ana").collection(
            "lines",
            vec![line(2, 2), line(3, 30), line(4, 4)],
        );

        let ops = merge_ops(&detached, &persisted);

        let inserts: Vec<_> = ops.iter().filter(|op| op.is_insert()).collect();
        let deletes: Vec<_> = ops.iter().filter(|op| op.is_delete()).collect();
        let updates: Vec<_> = ops.iter().filter(|op| op.is_update()).collect();

        assert_eq!(inserts.len(), 1); // add(4)
        assert_eq!(deletes.len(), 1); // delete(1)
        assert_eq!(updates.len(), 1); // merge(3) changed qty; merge(2) is clean

        match deletes[0] {
            StagedOp::Delete { key_values, .. } => assert_eq!(key_values, &[Value::BigInt(1)]),
            _ => unreachable!(),
        }
        match inserts[0] {
            StagedOp::Insert { values, .. } => assert!(values.contains(&Value::BigInt(4))),
            _ => unreachable!(),
        }
    }

    #[test]
    fn keyless_detached_child_is_added() {
        let persisted = user(1, "Ana").collection("lines", vec![]);
        let detached = user(1, "Ana").collection(
            "lines",
            vec![EntityNode::new("OrderLine").scalar("qty", 5_i64)],
        );

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(ops.len(), 1);
        assert!(ops[0].is_insert());
    }

    #[test]
    fn many_to_many_reconciles_link_rows_only() {
        // Persisted links {1, 2}, detached {2, 3}.
        let persisted = user(1, "Ana").collection("roles", vec![role(1, "a"), role(2, "b")]);
        let detached = user(1, "Ana").collection("roles", vec![role(2, "b"), role(3, "c")]);

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(
            ops,
            vec![
                StagedOp::Link {
                    table: "user_roles".into(),
                    local_column: "user_id".into(),
                    local_value: Value::BigInt(1),
                    remote_column: "role_id".into(),
                    remote_value: Value::BigInt(3),
                },
                StagedOp::Unlink {
                    table: "user_roles".into(),
                    local_column: "user_id".into(),
                    local_value: Value::BigInt(1),
                    remote_column: "role_id".into(),
                    remote_value: Value::BigInt(1),
                },
            ]
        );
    }

    #[test]
    fn user_roles_scenario_stages_single_unlink() {
        // Persisted Roles = {Admin, Viewer}; detached Roles = {Admin}.
        let admin = role(10, "Admin");
        let viewer = role(11, "Viewer");
        let persisted = user(1, "Ana").collection("roles", vec![admin.clone(), viewer]);
        let detached = user(1, "Ana").collection("roles", vec![admin]);

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(
            ops,
            vec![StagedOp::Unlink {
                table: "user_roles".into(),
                local_column: "user_id".into(),
                local_value: Value::BigInt(1),
                remote_column: "role_id".into(),
                remote_value: Value::BigInt(11),
            }]
        );
    }

    #[test]
    fn many_to_many_never_touches_entities() {
        let persisted = user(1, "Ana").collection("roles", vec![role(1, "a")]);
        let detached = user(1, "Ana").collection("roles", vec![role(2, "b")]);

        let ops = merge_ops(&detached, &persisted);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(StagedOp::is_link_op));
    }

    #[test]
    fn delete_cascades_owned_and_unlinks_associated() {
        let schema = schema();
        let engine = MergeEngine::new(&schema);
        let ty = schema.entity_type("User").unwrap();

        let persisted = user(1, "Ana")
            .single(
                "profile",
                Some(EntityNode::new("Profile").scalar("id", 7_i64).scalar("bio", "hi")),
            )
            .single("country", Some(EntityNode::new("Country").scalar("id", 44_i64)))
            .collection("lines", vec![line(5, 1)])
            .collection("roles", vec![role(9, "admin")]);

        let mut uow = UnitOfWork::new();
        engine.delete(ty, &persisted, &mut uow).unwrap();
        let ops = uow.take();

        // Owned child rows and the link row go, then the root; the
        // associated Country row is left in storage.
        assert!(ops.iter().all(|op| op.table() != "countries"));

        let tables: Vec<_> = ops.iter().map(StagedOp::table).collect();
        assert_eq!(tables, vec!["profiles", "order_lines", "user_roles", "users"]);

        // Child-first delete order: the root row is last.
        assert!(matches!(
            ops.last().unwrap(),
            StagedOp::Delete { table, .. } if table == "users"
        ));
        assert!(matches!(&ops[2], StagedOp::Unlink { .. }));
    }

    #[test]
    fn add_stages_parent_before_children() {
        let schema = schema();
        let engine = MergeEngine::new(&schema);
        let ty = schema.entity_type("User").unwrap();

        let detached = user(1, "Ana")
            .single(
                "profile",
                Some(EntityNode::new("Profile").scalar("id", 7_i64).scalar("bio", "hi")),
            )
            .collection("roles", vec![role(3, "admin")]);

        let mut uow = UnitOfWork::new();
        engine.add(ty, &detached, &mut uow).unwrap();
        let ops = uow.take();

        let tables: Vec<_> = ops.iter().map(StagedOp::table).collect();
        assert_eq!(tables, vec!["users", "profiles", "user_roles"]);
        assert!(ops[0].is_insert());
        assert!(ops[1].is_insert());
        // Associated role rides as a link row, never as an entity insert.
        assert!(matches!(&ops[2], StagedOp::Link { .. }));
    }

    #[test]
    fn duplicate_detached_children_last_wins() {
        let persisted = user(1, "Ana").collection("lines", vec![line(1, 1)]);
        let detached = user(1, "Ana").collection("lines", vec![line(1, 5), line(1, 9)]);

        let ops = merge_ops(&detached, &persisted);
        let updates: Vec<_> = ops.iter().filter(|op| op.is_update()).collect();
        // Both duplicates merge against the same persisted child; the later
        // staged update prevails on apply.
        assert_eq!(updates.len(), 2);
        match updates.last().unwrap() {
            StagedOp::Update { set_values, .. } => {
                assert_eq!(set_values, &[Value::BigInt(9)]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn merge_returns_reconciled_graph() {
        let schema = schema();
        let engine = MergeEngine::new(&schema);
        let ty = schema.entity_type("User").unwrap();

        let persisted = user(1, "Ana").collection("lines", vec![line(1, 1), line(2, 2)]);
        let detached = EntityNode::new("User")
            .scalar("id", 1_i64)
            .scalar("name", "Bea")
            .collection("lines", vec![line(2, 20)]);

        let mut uow = UnitOfWork::new();
        let merged = engine.merge(ty, &detached, &persisted, &mut uow).unwrap();

        assert_eq!(merged.get_scalar("name"), Some(&Value::Text("Bea".into())));
        // Email was omitted on the detached side and survives.
        assert_eq!(
            merged.get_scalar("email"),
            Some(&Value::Text("ana@example.com".into()))
        );
        let lines = merged.get_collection("lines");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].get_scalar("qty"), Some(&Value::BigInt(20)));
    }
}
