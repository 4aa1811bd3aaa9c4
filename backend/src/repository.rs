//! Task repository: validation plus the single write path into the store.
//!
//! Writes are serialized behind one async mutex and each committed write is
//! announced on a broadcast feed that live queries subscribe to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    normalize_name, sort_by_creation, Category, StoreChange, Task, TaskFilter, TodoError,
};
use tokio::sync::{broadcast, Mutex};

use crate::clock::{Clock, SystemClock};
use crate::store::{Store, StoreError};

/// Buffered notifications per subscriber before it observes a lag.
const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: Category,
    pub task_count: usize,
    pub completed_count: usize,
}

struct Inner {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<StoreChange>,
}

/// Cloneable handle shared by every screen and query that needs the store.
#[derive(Clone)]
pub struct TaskRepository {
    inner: Arc<Inner>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                write_lock: Mutex::new(()),
                changes,
            }),
        }
    }

    /// Read access for collaborators such as the widget summary.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }

    fn publish(&self, change: StoreChange) {
        // No receivers just means no screen is observing.
        let _ = self.inner.changes.send(change);
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, TodoError> {
        let name = normalize_name(name)
            .ok_or_else(|| TodoError::Validation("category name must not be empty".into()))?;

        let _guard = self.inner.write_lock.lock().await;
        if self.inner.store.category(name).await?.is_some() {
            tracing::warn!(category = name, "Rejected duplicate category");
            return Err(TodoError::Duplicate(name.to_string()));
        }

        let category = Category::new(name, self.now());
        self.inner
            .store
            .insert_category(&category)
            .await
            .map_err(|err| write_failed("create category", err))?;

        tracing::info!(category = %category.name, "Category created");
        self.publish(StoreChange::CategoryCreated {
            name: category.name.clone(),
        });
        Ok(category)
    }

    pub async fn create_task(
        &self,
        category_name: &str,
        title: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, TodoError> {
        let title = normalize_name(title)
            .ok_or_else(|| TodoError::Validation("task title must not be empty".into()))?;

        let _guard = self.inner.write_lock.lock().await;
        let category = self
            .inner
            .store
            .category(category_name.trim())
            .await?
            .ok_or_else(|| TodoError::category_not_found(category_name.trim()))?;

        let task = Task::new(category.name, title, due_date, self.now());
        self.inner
            .store
            .upsert_task(&task)
            .await
            .map_err(|err| write_failed("create task", err))?;

        tracing::info!(task_id = %task.id, category = %task.category_name, "Task created");
        self.publish(StoreChange::TaskCreated {
            category_name: task.category_name.clone(),
            id: task.id,
        });
        Ok(task)
    }

    /// Flips the stored completion state and persists it. On success `task`
    /// is refreshed from the stored record; on failure it is left untouched.
    pub async fn toggle_completion(&self, task: &mut Task) -> Result<Task, TodoError> {
        let _guard = self.inner.write_lock.lock().await;
        let Some(mut stored) = self.inner.store.task(task.id).await? else {
            return Err(task_not_found(task));
        };
        stored.toggle(self.now());

        if let Err(err) = self.inner.store.upsert_task(&stored).await {
            tracing::warn!(task_id = %task.id, error = %err, "Completion toggle failed, reverted");
            return Err(err.into());
        }

        tracing::info!(task_id = %stored.id, completed = stored.is_completed, "Task toggled");
        self.publish(StoreChange::TaskUpdated {
            category_name: stored.category_name.clone(),
            id: stored.id,
        });
        *task = stored.clone();
        Ok(stored)
    }

    pub async fn delete_task(&self, task: &Task) -> Result<(), TodoError> {
        let _guard = self.inner.write_lock.lock().await;
        let removed = self
            .inner
            .store
            .remove_task(task.id)
            .await
            .map_err(|err| write_failed("delete task", err))?;
        if !removed {
            return Err(task_not_found(task));
        }

        tracing::info!(task_id = %task.id, "Task deleted");
        self.publish(StoreChange::TaskDeleted {
            category_name: task.category_name.clone(),
            id: task.id,
        });
        Ok(())
    }

    /// Purges the category's tasks, then the category itself.
    ///
    /// The two phases are not one transaction: if a task removal fails the
    /// category is left in place and any tasks removed so far stay removed.
    /// Tasks left dangling by an earlier interrupted delete are purged even
    /// when the category record is already gone.
    pub async fn delete_category(&self, name: &str) -> Result<(), TodoError> {
        let name = normalize_name(name)
            .ok_or_else(|| TodoError::Validation("category name must not be empty".into()))?;

        let _guard = self.inner.write_lock.lock().await;
        let category = self.inner.store.category(name).await?;
        let tasks = self.inner.store.tasks(&TaskFilter::category(name)).await?;
        if category.is_none() && tasks.is_empty() {
            return Err(TodoError::category_not_found(name));
        }

        for (purged, task) in tasks.iter().enumerate() {
            if let Err(err) = self.inner.store.remove_task(task.id).await {
                tracing::warn!(
                    category = name,
                    purged,
                    remaining = tasks.len() - purged,
                    error = %err,
                    "Task purge failed, category kept"
                );
                return Err(err.into());
            }
            self.publish(StoreChange::TaskDeleted {
                category_name: name.to_string(),
                id: task.id,
            });
        }
        tracing::info!(category = name, count = tasks.len(), "Purged category tasks");

        if category.is_some() {
            self.inner
                .store
                .remove_category(name)
                .await
                .map_err(|err| write_failed("delete category", err))?;
        }

        tracing::info!(category = name, "Category deleted");
        self.publish(StoreChange::CategoryDeleted {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Removes every category and task.
    pub async fn reset_all(&self) -> Result<(), TodoError> {
        let _guard = self.inner.write_lock.lock().await;
        self.inner
            .store
            .clear()
            .await
            .map_err(|err| write_failed("reset data", err))?;

        tracing::info!("All data reset");
        self.publish(StoreChange::Reset);
        Ok(())
    }

    /// Oldest first, the order categories were created in.
    pub async fn categories(&self) -> Result<Vec<Category>, TodoError> {
        let mut categories = self.inner.store.categories().await?;
        categories.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    pub async fn category_summaries(&self) -> Result<Vec<CategorySummary>, TodoError> {
        let categories = self.categories().await?;
        let tasks = self.inner.store.tasks(&TaskFilter::all()).await?;

        Ok(categories
            .into_iter()
            .map(|category| {
                let (task_count, completed_count) = tasks
                    .iter()
                    .filter(|task| task.category_name == category.name)
                    .fold((0, 0), |(total, done), task| {
                        (total + 1, done + usize::from(task.is_completed))
                    });
                CategorySummary {
                    category,
                    task_count,
                    completed_count,
                }
            })
            .collect())
    }

    /// Tasks of one category, newest first.
    pub async fn tasks_in(&self, category_name: &str) -> Result<Vec<Task>, TodoError> {
        let mut tasks = self
            .inner
            .store
            .tasks(&TaskFilter::category(category_name))
            .await?;
        sort_by_creation(&mut tasks);
        Ok(tasks)
    }

    pub async fn task_count(&self, category_name: &str) -> Result<usize, TodoError> {
        Ok(self
            .inner
            .store
            .tasks(&TaskFilter::category(category_name))
            .await?
            .len())
    }
}

fn write_failed(operation: &str, err: StoreError) -> TodoError {
    tracing::warn!(operation, error = %err, "Store write failed");
    err.into()
}

fn task_not_found(task: &Task) -> TodoError {
    TodoError::NotFound(format!("task \"{}\" does not exist", task.title))
}
