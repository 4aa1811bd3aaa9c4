use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use shared::{Category, Task, TaskFilter};
use uuid::Uuid;

use super::{Store, StoreError};

/// Redis-backed store. Records are JSON strings under
/// `{prefix}:category:{name}` and `{prefix}:task:{id}`.
pub struct RedisStore {
    client: Client,
    prefix: String,
}

impl RedisStore {
    /// Parses the URL; no connection is made until the first call.
    pub fn open(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
            prefix: prefix.into(),
        })
    }

    fn category_key(&self, name: &str) -> String {
        format!("{}:category:{}", self.prefix, name)
    }

    fn task_key(&self, id: Uuid) -> String {
        format!("{}:task:{}", self.prefix, id)
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut conn = self.connection().await?;
        let json: Option<String> = conn.get(key).await?;
        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn load_all<T: DeserializeOwned>(&self, pattern: &str) -> Result<Vec<T>, StoreError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = conn.keys(pattern).await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            // Gone between KEYS and GET.
            let Some(json) = conn.get::<_, Option<String>>(&key).await? else {
                continue;
            };
            match serde_json::from_str::<T>(&json) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(%key, error = %err, "Skipping unreadable record"),
            }
        }
        Ok(records)
    }

    async fn save<T: serde::Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.connection().await?;
        let _: () = conn.set(key, json).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        self.load_all(&self.category_key("*")).await
    }

    async fn category(&self, name: &str) -> Result<Option<Category>, StoreError> {
        self.load(&self.category_key(name)).await
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        self.save(&self.category_key(&category.name), category).await
    }

    async fn remove_category(&self, name: &str) -> Result<bool, StoreError> {
        self.remove(&self.category_key(name)).await
    }

    async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let pattern = format!("{}:task:*", self.prefix);
        let mut tasks: Vec<Task> = self.load_all(&pattern).await?;
        tasks.retain(|task| filter.matches(task));
        Ok(tasks)
    }

    async fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.load(&self.task_key(id)).await
    }

    async fn upsert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.save(&self.task_key(task.id), task).await
    }

    async fn remove_task(&self, id: Uuid) -> Result<bool, StoreError> {
        self.remove(&self.task_key(id)).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = conn.keys(format!("{}:*", self.prefix)).await?;
        if !keys.is_empty() {
            let _: usize = conn.del(keys).await?;
        }
        Ok(())
    }
}
