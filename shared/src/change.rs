use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Task;

/// One row-level difference between two snapshots of a live query.
///
/// `Delete`, `Update` and `Move::from` index into the previous snapshot;
/// `Insert` and `Move::to` index into the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    Insert { task: Task, index: usize },
    Delete { id: Uuid, index: usize },
    Move { id: Uuid, from: usize, to: usize },
    Update { id: Uuid, index: usize },
}

impl Change {
    /// Inserts, deletes and moves change membership or ordering of the set.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Change::Update { .. })
    }
}

/// All changes produced by one store notification, together with the
/// snapshot they lead to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub category_name: String,
    pub changes: Vec<Change>,
    pub snapshot: Vec<Task>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn has_structural_changes(&self) -> bool {
        self.changes.iter().any(Change::is_structural)
    }

    pub fn updated_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.changes.iter().filter_map(|change| match change {
            Change::Update { id, .. } => Some(*id),
            _ => None,
        })
    }
}

/// Published by the repository after every committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    CategoryCreated { name: String },
    CategoryDeleted { name: String },
    TaskCreated { category_name: String, id: Uuid },
    TaskUpdated { category_name: String, id: Uuid },
    TaskDeleted { category_name: String, id: Uuid },
    Reset,
}

impl StoreChange {
    /// Whether a query filtered on `category` has to refetch.
    pub fn affects(&self, category: &str) -> bool {
        match self {
            StoreChange::CategoryCreated { .. } => false,
            StoreChange::CategoryDeleted { name } => name == category,
            StoreChange::TaskCreated { category_name, .. }
            | StoreChange::TaskUpdated { category_name, .. }
            | StoreChange::TaskDeleted { category_name, .. } => category_name == category,
            StoreChange::Reset => true,
        }
    }
}
