use backend::{TaskQuery, TaskRepository};
use chrono::{DateTime, Utc};
use shared::{Section, Task, TodoError};
use thiserror::Error;
use uuid::Uuid;

use crate::display::DisplayedList;
use crate::reconciler::{ListReconciler, SectionHeader, UiBatch};

/// Lifecycle of one list screen. `Detached` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Idle,
    Loading,
    Synced,
    Detached,
}

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("cannot {action} while the screen is {state:?}")]
    InvalidState {
        action: &'static str,
        state: ScreenState,
    },

    #[error(transparent)]
    Todo(#[from] TodoError),
}

/// User actions on a category's task list.
#[derive(Debug, Clone)]
pub enum Msg {
    CreateTask {
        title: String,
        due_date: Option<DateTime<Utc>>,
    },
    ToggleTask(Uuid),
    DeleteTask(Uuid),
    DeleteCategory,
}

/// One category's task list: owns the live query while attached, keeps the
/// displayed rows in step with it, and routes user actions to the
/// repository.
pub struct TaskListScreen {
    repo: TaskRepository,
    category_name: String,
    state: ScreenState,
    query: Option<TaskQuery>,
    reconciler: ListReconciler,
    display: DisplayedList,
    last_error: Option<String>,
}

impl TaskListScreen {
    pub fn new(repo: TaskRepository, category_name: impl Into<String>) -> Self {
        Self {
            repo,
            category_name: category_name.into(),
            state: ScreenState::Idle,
            query: None,
            reconciler: ListReconciler::default(),
            display: DisplayedList::default(),
            last_error: None,
        }
    }

    pub fn state(&self) -> ScreenState {
        self.state
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn display(&self) -> &DisplayedList {
        &self.display
    }

    pub fn rows(&self, section: Section) -> &[Task] {
        self.display.rows(section)
    }

    pub fn headers(&self) -> [SectionHeader; 2] {
        self.reconciler.headers()
    }

    pub fn task_count(&self) -> usize {
        self.reconciler.partition().len()
    }

    /// Message from the most recent failed action, for the host to present.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fetches the category and starts observing it.
    pub async fn attach(&mut self) -> Result<(), ScreenError> {
        self.require(ScreenState::Idle, "attach")?;
        self.state = ScreenState::Loading;

        match TaskQuery::attach(&self.repo, self.category_name.clone()).await {
            Ok(query) => {
                self.reconciler = ListReconciler::new(query.snapshot());
                self.display = DisplayedList::from_partition(self.reconciler.partition());
                self.query = Some(query);
                self.state = ScreenState::Synced;
                tracing::debug!(
                    category = %self.category_name,
                    rows = self.task_count(),
                    "Screen synced"
                );
                Ok(())
            }
            Err(err) => {
                self.state = ScreenState::Idle;
                Err(self.record(err))
            }
        }
    }

    /// Waits for the next change to this category and applies it to the
    /// displayed rows. `Ok(None)` means the change feed has closed.
    pub async fn sync(&mut self) -> Result<Option<UiBatch>, ScreenError> {
        self.require(ScreenState::Synced, "sync")?;
        let Some(query) = self.query.as_mut() else {
            return Err(ScreenError::InvalidState {
                action: "sync",
                state: self.state,
            });
        };

        let delivered = query.deliver(&mut self.reconciler).await;
        match delivered {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(err) => return Err(self.record(err)),
        }
        let batch = self.reconciler.take_delivered().unwrap_or_default();
        Ok(Some(self.show(batch)))
    }

    /// Applies changes that are already queued, without waiting.
    pub async fn sync_pending(&mut self) -> Result<Option<UiBatch>, ScreenError> {
        self.require(ScreenState::Synced, "sync")?;
        let Some(query) = self.query.as_mut() else {
            return Err(ScreenError::InvalidState {
                action: "sync",
                state: self.state,
            });
        };

        let fetched = query.try_next_batch().await;
        let changes = match fetched {
            Ok(Some(changes)) => changes,
            Ok(None) => return Ok(None),
            Err(err) => return Err(self.record(err)),
        };
        let batch = self.reconciler.reconcile(&changes);
        Ok(Some(self.show(batch)))
    }

    pub async fn update(&mut self, msg: Msg) -> Result<(), ScreenError> {
        self.require(ScreenState::Synced, "update")?;
        tracing::debug!(category = %self.category_name, ?msg, "Screen action");

        let result = match msg {
            Msg::CreateTask { title, due_date } => self
                .repo
                .create_task(&self.category_name, &title, due_date)
                .await
                .map(drop),
            Msg::ToggleTask(id) => match self.reconciler.partition().find(id).cloned() {
                // The repository restores `task` on failure, so what is on
                // screen never runs ahead of the store.
                Some(mut task) => self.repo.toggle_completion(&mut task).await.map(drop),
                None => Err(not_on_screen(id)),
            },
            Msg::DeleteTask(id) => match self.reconciler.partition().find(id).cloned() {
                Some(task) => self.repo.delete_task(&task).await,
                None => Err(not_on_screen(id)),
            },
            Msg::DeleteCategory => self.repo.delete_category(&self.category_name).await,
        };

        match result {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Releases the observer. The screen cannot be used afterwards.
    pub fn detach(&mut self) {
        self.query = None;
        self.state = ScreenState::Detached;
        tracing::debug!(category = %self.category_name, "Screen detached");
    }

    fn show(&mut self, batch: UiBatch) -> UiBatch {
        let partition = self.reconciler.partition();
        match self.display.apply(&batch, partition) {
            Ok(()) => batch,
            Err(err) => {
                tracing::warn!(error = %err, "Row update rejected, reloading sections");
                self.display = DisplayedList::from_partition(partition);
                UiBatch::full_reload()
            }
        }
    }

    fn require(&self, state: ScreenState, action: &'static str) -> Result<(), ScreenError> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> ScreenError {
        ScreenError::InvalidState {
            action,
            state: self.state,
        }
    }

    fn record(&mut self, err: TodoError) -> ScreenError {
        tracing::warn!(category = %self.category_name, error = %err, "Screen action failed");
        self.last_error = Some(err.to_string());
        err.into()
    }
}

fn not_on_screen(id: Uuid) -> TodoError {
    TodoError::NotFound(format!("task {id} is not in this list"))
}
