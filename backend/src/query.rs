//! Live, filtered view over one category's tasks.
//!
//! A [`TaskQuery`] keeps the last fetched snapshot (newest first) and turns
//! repository notifications into [`ChangeBatch`]es by refetching and
//! diffing against that snapshot by task id.

use std::collections::HashMap;
use std::sync::Arc;

use shared::{
    sort_by_creation, Change, ChangeBatch, StoreChange, Task, TaskFilter, TodoError,
};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use uuid::Uuid;

use crate::repository::TaskRepository;
use crate::store::Store;

/// Receives one batch at a time, bracketed by `begin_changes` and
/// `end_changes`.
pub trait ChangeHandler {
    fn begin_changes(&mut self) {}

    fn on_change(&mut self, change: &Change);

    fn end_changes(&mut self, _snapshot: &[Task]) {}
}

pub struct TaskQuery {
    store: Arc<dyn Store>,
    category_name: String,
    rows: Vec<Task>,
    feed: broadcast::Receiver<StoreChange>,
    /// A relevant change was seen but not yet refetched successfully.
    dirty: bool,
}

impl TaskQuery {
    /// Subscribes to the repository and performs the initial fetch.
    /// A category without tasks yields an empty snapshot.
    pub async fn attach(
        repo: &TaskRepository,
        category_name: impl Into<String>,
    ) -> Result<Self, TodoError> {
        let category_name = category_name.into();
        // Subscribe first so nothing written during the fetch is missed.
        let feed = repo.subscribe();
        let rows = repo.tasks_in(&category_name).await?;
        tracing::debug!(category = %category_name, rows = rows.len(), "Query attached");

        Ok(Self {
            store: repo.store().clone(),
            category_name,
            rows,
            feed,
            dirty: false,
        })
    }

    pub fn category_name(&self) -> &str {
        &self.category_name
    }

    pub fn snapshot(&self) -> &[Task] {
        &self.rows
    }

    /// Waits for the next store change touching this category.
    ///
    /// Notifications already queued behind it are folded into the same
    /// batch. Returns `Ok(None)` once every repository handle is dropped.
    pub async fn next_batch(&mut self) -> Result<Option<ChangeBatch>, TodoError> {
        loop {
            if !self.dirty {
                match self.feed.recv().await {
                    Ok(change) if !change.affects(&self.category_name) => continue,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(category = %self.category_name, skipped, "Change feed lagged");
                    }
                    Err(RecvError::Closed) => return Ok(None),
                }
                self.dirty = true;
            }
            self.drain_pending();
            if let Some(batch) = self.refresh().await? {
                return Ok(Some(batch));
            }
        }
    }

    /// Like [`next_batch`](Self::next_batch) but only looks at notifications
    /// that are already queued, or a refetch that previously failed.
    pub async fn try_next_batch(&mut self) -> Result<Option<ChangeBatch>, TodoError> {
        self.drain_pending();
        if !self.dirty {
            return Ok(None);
        }
        self.refresh().await
    }

    /// Waits for the next batch and hands it to `handler`. Returns `false`
    /// once the feed is closed.
    pub async fn deliver<H: ChangeHandler + ?Sized>(
        &mut self,
        handler: &mut H,
    ) -> Result<bool, TodoError> {
        let Some(batch) = self.next_batch().await? else {
            return Ok(false);
        };
        dispatch(&batch, handler);
        Ok(true)
    }

    /// Empties the queue, marking the query dirty if anything queued
    /// needs a refetch.
    fn drain_pending(&mut self) {
        loop {
            match self.feed.try_recv() {
                Ok(change) => self.dirty |= change.affects(&self.category_name),
                Err(TryRecvError::Lagged(_)) => self.dirty = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return,
            }
        }
    }

    async fn refresh(&mut self) -> Result<Option<ChangeBatch>, TodoError> {
        let mut rows = self
            .store
            .tasks(&TaskFilter::category(self.category_name.as_str()))
            .await?;
        sort_by_creation(&mut rows);
        let changes = diff(&self.rows, &rows);
        self.rows = rows;
        self.dirty = false;

        if changes.is_empty() {
            return Ok(None);
        }
        tracing::debug!(category = %self.category_name, changes = changes.len(), "Query changed");
        Ok(Some(ChangeBatch {
            category_name: self.category_name.clone(),
            changes,
            snapshot: self.rows.clone(),
        }))
    }
}

pub fn dispatch<H: ChangeHandler + ?Sized>(batch: &ChangeBatch, handler: &mut H) {
    handler.begin_changes();
    for change in &batch.changes {
        handler.on_change(change);
    }
    handler.end_changes(&batch.snapshot);
}

/// Row changes turning `old` into `new`.
///
/// Deletes come first (descending old index), then inserts (ascending new
/// index), then moves and updates of surviving rows. Only survivors outside
/// the longest run that kept its relative order are reported as moved.
pub fn diff(old: &[Task], new: &[Task]) -> Vec<Change> {
    let old_ids: HashMap<Uuid, usize> = index_by_id(old);
    let new_ids: HashMap<Uuid, usize> = index_by_id(new);
    let mut changes = Vec::new();

    for (index, task) in old.iter().enumerate().rev() {
        if !new_ids.contains_key(&task.id) {
            changes.push(Change::Delete { id: task.id, index });
        }
    }

    for (index, task) in new.iter().enumerate() {
        if !old_ids.contains_key(&task.id) {
            changes.push(Change::Insert {
                task: task.clone(),
                index,
            });
        }
    }

    let survivors: Vec<(&Task, usize, usize)> = old
        .iter()
        .enumerate()
        .filter_map(|(from, task)| new_ids.get(&task.id).map(|&to| (task, from, to)))
        .collect();
    let targets: Vec<usize> = survivors.iter().map(|&(_, _, to)| to).collect();
    let in_order = longest_increasing(&targets);

    for (&(task, from, to), kept) in survivors.iter().zip(in_order) {
        if !kept {
            changes.push(Change::Move {
                id: task.id,
                from,
                to,
            });
        } else if new.get(to) != Some(task) {
            changes.push(Change::Update {
                id: task.id,
                index: from,
            });
        }
    }

    changes
}

fn index_by_id(tasks: &[Task]) -> HashMap<Uuid, usize> {
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| (task.id, index))
        .collect()
}

/// Marks the members of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = prev[i];
    }
    keep
}
