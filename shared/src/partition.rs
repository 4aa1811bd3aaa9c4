use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{sort_by_creation, Task};

/// The two sections of a category's task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Pending,
    Completed,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Pending, Section::Completed];

    pub fn index(self) -> usize {
        match self {
            Section::Pending => 0,
            Section::Completed => 1,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Pending => "To do",
            Section::Completed => "Completed",
        }
    }

    pub fn for_task(task: &Task) -> Self {
        if task.is_completed {
            Section::Completed
        } else {
            Section::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLocation {
    pub section: Section,
    pub row: usize,
}

/// Pending/completed split of a task set.
///
/// Pending rows are newest-created first, completed rows most recently
/// completed first. A task appears in exactly one section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pending: Vec<Task>,
    completed: Vec<Task>,
}

impl Partition {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let (mut completed, mut pending): (Vec<Task>, Vec<Task>) =
            tasks.into_iter().cloned().partition(|task| task.is_completed);

        sort_by_creation(&mut pending);
        completed.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Self { pending, completed }
    }

    pub fn section(&self, section: Section) -> &[Task] {
        match section {
            Section::Pending => &self.pending,
            Section::Completed => &self.completed,
        }
    }

    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn locate(&self, id: Uuid) -> Option<RowLocation> {
        Section::ALL.into_iter().find_map(|section| {
            self.section(section)
                .iter()
                .position(|task| task.id == id)
                .map(|row| RowLocation { section, row })
        })
    }

    pub fn get(&self, location: RowLocation) -> Option<&Task> {
        self.section(location.section).get(location.row)
    }

    pub fn find(&self, id: Uuid) -> Option<&Task> {
        self.locate(id).and_then(|location| self.get(location))
    }

    pub fn len(&self) -> usize {
        self.pending.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn splits_and_orders_sections() {
        let mut a = Task::new("Home", "a", None, at(0));
        let b = Task::new("Home", "b", None, at(1));
        let mut c = Task::new("Home", "c", None, at(2));
        let d = Task::new("Home", "d", None, at(3));
        a.toggle(at(20));
        c.toggle(at(10));

        let partition = Partition::from_tasks(&[a, b, c, d]);

        assert_eq!(titles(partition.pending()), ["d", "b"]);
        assert_eq!(titles(partition.completed()), ["a", "c"]);
        assert_eq!(partition.len(), 4);
    }

    #[test]
    fn locate_reports_section_and_row() {
        let first = Task::new("Home", "first", None, at(0));
        let mut done = Task::new("Home", "done", None, at(1));
        done.toggle(at(2));

        let partition = Partition::from_tasks(&[first.clone(), done.clone()]);

        assert_eq!(
            partition.locate(done.id),
            Some(RowLocation {
                section: Section::Completed,
                row: 0
            })
        );
        assert_eq!(partition.find(first.id).map(|t| t.title.as_str()), Some("first"));
        assert!(partition.locate(Uuid::now_v7()).is_none());
        assert_eq!(Section::for_task(&done), Section::Completed);
    }

    #[test]
    fn empty_partition_is_valid() {
        let partition = Partition::from_tasks(Vec::<Task>::new().iter());
        assert!(partition.is_empty());
        assert!(partition.section(Section::Pending).is_empty());
    }
}
