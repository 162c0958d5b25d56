//! Unit of work: the staged-operation buffer.
//!
//! The merge engine queues inserts, updates, deletes, and link-row
//! operations here; nothing touches storage until the context drains the
//! buffer into the store's atomic apply. Operations keep their staging
//! order — the engine stages parent-first inserts and child-first deletes,
//! so no re-sorting is needed.

use detached_core::store::StagedOp;

/// Tracks all pending operations for one load-merge-save cycle.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    ops: Vec<StagedOp>,
}

impl UnitOfWork {
    /// Create an empty unit of work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation.
    pub fn stage(&mut self, op: StagedOp) {
        self.ops.push(op);
    }

    /// The staged operations, in staging order.
    #[must_use]
    pub fn ops(&self) -> &[StagedOp] {
        &self.ops
    }

    /// Check if there are any pending operations.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.ops.is_empty()
    }

    /// Get the count of pending operations by kind.
    #[must_use]
    pub fn counts(&self) -> PendingCounts {
        let mut counts = PendingCounts::default();
        for op in &self.ops {
            match op {
                StagedOp::Insert { .. } => counts.inserts += 1,
                StagedOp::Update { .. } => counts.updates += 1,
                StagedOp::Delete { .. } => counts.deletes += 1,
                StagedOp::Link { .. } | StagedOp::Unlink { .. } => counts.links += 1,
            }
        }
        counts
    }

    /// Drain all staged operations, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<StagedOp> {
        std::mem::take(&mut self.ops)
    }

    /// Discard all staged operations.
    ///
    /// Call this after a successful save, or to abandon a merge.
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

/// Count of pending operations by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    /// Rows pending INSERT.
    pub inserts: usize,
    /// Rows pending UPDATE.
    pub updates: usize,
    /// Rows pending DELETE.
    pub deletes: usize,
    /// Link-row operations pending (inserts and deletes).
    pub links: usize,
}

impl PendingCounts {
    /// Total number of pending operations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inserts + self.updates + self.deletes + self.links
    }

    /// Check if there are no pending operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detached_core::value::Value;

    fn delete_op(id: i64) -> StagedOp {
        StagedOp::Delete {
            table: "users".into(),
            key_columns: vec!["id".into()],
            key_values: vec![Value::BigInt(id)],
        }
    }

    #[test]
    fn stage_and_count() {
        let mut uow = UnitOfWork::new();
        assert!(!uow.has_changes());

        uow.stage(StagedOp::Insert {
            table: "users".into(),
            columns: vec!["id".into()],
            values: vec![Value::BigInt(1)],
        });
        uow.stage(delete_op(2));
        uow.stage(StagedOp::Unlink {
            table: "user_roles".into(),
            local_column: "user_id".into(),
            local_value: Value::BigInt(1),
            remote_column: "role_id".into(),
            remote_value: Value::BigInt(9),
        });

        assert!(uow.has_changes());
        let counts = uow.counts();
        assert_eq!(counts.inserts, 1);
        assert_eq!(counts.deletes, 1);
        assert_eq!(counts.links, 1);
        assert_eq!(counts.updates, 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn take_preserves_staging_order() {
        let mut uow = UnitOfWork::new();
        uow.stage(delete_op(1));
        uow.stage(delete_op(2));
        uow.stage(delete_op(3));

        let ops = uow.take();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops[0],
            StagedOp::Delete {
                table: "users".into(),
                key_columns: vec!["id".into()],
                key_values: vec![Value::BigInt(1)],
            }
        );
        assert!(!uow.has_changes());
    }

    #[test]
    fn clear_removes_all() {
        let mut uow = UnitOfWork::new();
        uow.stage(delete_op(1));
        uow.clear();
        assert!(!uow.has_changes());
        assert!(uow.counts().is_empty());
    }
}
