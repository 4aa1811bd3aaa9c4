use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use shared::{Category, Task, TaskFilter};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};

const UNLIMITED: usize = usize::MAX;

#[derive(Default)]
struct Records {
    categories: BTreeMap<String, Category>,
    tasks: HashMap<Uuid, Task>,
}

/// Map-backed store. Supports fault injection so callers can exercise
/// their failure paths.
pub struct InMemoryStore {
    records: RwLock<Records>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    task_removals_left: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            records: RwLock::default(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            task_removals_left: AtomicUsize::new(UNLIMITED),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every read returns [`StoreError::Injected`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// While set, every write returns [`StoreError::Injected`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Let `successes` more task removals through, then fail the rest.
    pub fn fail_task_removals_after(&self, successes: usize) {
        self.task_removals_left.store(successes, Ordering::SeqCst);
    }

    /// Clears every injected fault.
    pub fn reset_faults(&self) {
        self.fail_reads.store(false, Ordering::SeqCst);
        self.fail_writes.store(false, Ordering::SeqCst);
        self.task_removals_left.store(UNLIMITED, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("read rejected".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("write rejected".into()));
        }
        Ok(())
    }

    fn check_task_removal(&self) -> Result<(), StoreError> {
        self.check_write()?;
        match self.task_removals_left.load(Ordering::SeqCst) {
            UNLIMITED => Ok(()),
            0 => Err(StoreError::Injected("task removal rejected".into())),
            _ => {
                self.task_removals_left.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        self.check_read()?;
        Ok(self.records.read().await.categories.values().cloned().collect())
    }

    async fn category(&self, name: &str) -> Result<Option<Category>, StoreError> {
        self.check_read()?;
        Ok(self.records.read().await.categories.get(name).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.check_write()?;
        self.records
            .write()
            .await
            .categories
            .insert(category.name.clone(), category.clone());
        Ok(())
    }

    async fn remove_category(&self, name: &str) -> Result<bool, StoreError> {
        self.check_write()?;
        Ok(self.records.write().await.categories.remove(name).is_some())
    }

    async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.check_read()?;
        let records = self.records.read().await;
        Ok(records
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }

    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.check_read()?;
        Ok(self.records.read().await.tasks.get(&id).cloned())
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.check_write()?;
        self.records.write().await.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn remove_task(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_task_removal()?;
        Ok(self.records.write().await.tasks.remove(&id).is_some())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.check_write()?;
        let mut records = self.records.write().await;
        records.tasks.clear();
        records.categories.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    #[tokio::test]
    async fn filters_tasks_by_category() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.upsert_task(&Task::new("Home", "a", None, now)).await.unwrap();
        store.upsert_task(&Task::new("Work", "b", None, now)).await.unwrap();

        let home = store.tasks(&TaskFilter::category("Home")).await.unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].title, "a");
        assert_eq!(store.tasks(&TaskFilter::all()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removal_budget_fails_after_successes() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let a = Task::new("Home", "a", None, now);
        let b = Task::new("Home", "b", None, now);
        store.upsert_task(&a).await.unwrap();
        store.upsert_task(&b).await.unwrap();

        store.fail_task_removals_after(1);
        assert!(store.remove_task(a.id).await.unwrap());
        assert_matches!(store.remove_task(b.id).await, Err(StoreError::Injected(_)));
        assert!(store.task(b.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_writes_leave_records_untouched() {
        let store = InMemoryStore::new();
        store.fail_writes(true);
        let result = store
            .insert_category(&Category::new("Home", Utc::now()))
            .await;
        assert_matches!(result, Err(StoreError::Injected(_)));
        assert!(store.categories().await.unwrap().is_empty());
    }
}
