use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
        }
    }
}

/// A single to-do item owned by one category.
///
/// `completed_at` is `Some` exactly when `is_completed` is true; the only
/// mutation after creation is [`Task::toggle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub category_name: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        category_name: impl Into<String>,
        title: impl Into<String>,
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            category_name: category_name.into(),
            title: title.into(),
            created_at,
            is_completed: false,
            completed_at: None,
            due_date,
        }
    }

    /// Flips completion, stamping `completed_at` with `now` or clearing it.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.is_completed = !self.is_completed;
        self.completed_at = self.is_completed.then_some(now);
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < now)
    }
}

/// Trims a user-entered name or title. Returns `None` when nothing is left.
pub fn normalize_name(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Equality predicate used when querying tasks from a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub category_name: Option<String>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self {
            category_name: Some(name.into()),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.category_name
            .as_deref()
            .map_or(true, |name| task.category_name == name)
    }
}

/// Newest first. Ties on `created_at` fall back to the (time-ordered) id.
pub fn sort_by_creation(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
