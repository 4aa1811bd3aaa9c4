//! Persistent store boundary.
//!
//! The repository is the only writer; everything else (live queries, the
//! widget) reads through the same [`Store`] trait. Implementations return
//! tasks unordered, sorting is the caller's business.

mod memory;
mod redis_store;

pub use memory::InMemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use shared::{Category, Task, TaskFilter, TodoError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("corrupt record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store is opened read-only")]
    ReadOnly,

    #[error("injected failure: {0}")]
    Injected(String),
}

impl From<StoreError> for TodoError {
    fn from(err: StoreError) -> Self {
        TodoError::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn category(&self, name: &str) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;
    /// Returns whether a record was removed.
    async fn remove_category(&self, name: &str) -> Result<bool, StoreError>;

    async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;
    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn upsert_task(&self, task: &Task) -> Result<(), StoreError>;
    async fn remove_task(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Removes every category and task.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Wraps a store so that every write fails with [`StoreError::ReadOnly`].
pub struct ReadOnly<S>(pub S);

#[async_trait]
impl<S: Store> Store for ReadOnly<S> {
    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        self.0.categories().await
    }

    async fn category(&self, name: &str) -> Result<Option<Category>, StoreError> {
        self.0.category(name).await
    }

    async fn insert_category(&self, _category: &Category) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    async fn remove_category(&self, _name: &str) -> Result<bool, StoreError> {
        Err(StoreError::ReadOnly)
    }

    async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.0.tasks(filter).await
    }

    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.0.task(id).await
    }

    async fn upsert_task(&self, _task: &Task) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }

    async fn remove_task(&self, _id: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::ReadOnly)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::ReadOnly)
    }
}
