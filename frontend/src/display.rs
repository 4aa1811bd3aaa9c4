use shared::{Partition, Section, Task};
use thiserror::Error;
use uuid::Uuid;

use crate::reconciler::{ListOp, UiBatch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("row {row} is out of range in section {section:?}")]
    RowOutOfRange { section: Section, row: usize },

    #[error("task {0} is no longer in the data source")]
    MissingTask(Uuid),
}

/// The rows currently on screen, per section.
///
/// Batches are applied the way a list view applies a batched update:
/// reloads and deletes refer to the rows before the batch, inserts to the
/// rows after it, and fresh row content is pulled from `source`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayedList {
    sections: [Vec<Task>; 2],
}

impl DisplayedList {
    pub fn from_partition(partition: &Partition) -> Self {
        Self {
            sections: Section::ALL.map(|section| partition.section(section).to_vec()),
        }
    }

    pub fn rows(&self, section: Section) -> &[Task] {
        &self.sections[section.index()]
    }

    pub fn matches(&self, partition: &Partition) -> bool {
        Section::ALL
            .into_iter()
            .all(|section| self.rows(section) == partition.section(section))
    }

    /// All-or-nothing: on error the displayed rows are left as they were.
    pub fn apply(&mut self, batch: &UiBatch, source: &Partition) -> Result<(), ApplyError> {
        let mut next = self.sections.clone();
        let mut deletes = Vec::new();
        let mut inserts = Vec::new();
        let mut reloaded_sections = Vec::new();

        for op in &batch.ops {
            match *op {
                ListOp::ReloadRow { section, row } => {
                    let old = self
                        .rows(section)
                        .get(row)
                        .ok_or(ApplyError::RowOutOfRange { section, row })?;
                    let fresh = source.find(old.id).ok_or(ApplyError::MissingTask(old.id))?;
                    next[section.index()][row] = fresh.clone();
                }
                ListOp::DeleteRow { section, row } => deletes.push((section, row)),
                ListOp::InsertRow { section, row } => inserts.push((section, row)),
                ListOp::ReloadSection(section) => reloaded_sections.push(section),
            }
        }

        deletes.sort_by_key(|&(section, row)| std::cmp::Reverse((section.index(), row)));
        for (section, row) in deletes {
            let rows = &mut next[section.index()];
            if row >= rows.len() {
                return Err(ApplyError::RowOutOfRange { section, row });
            }
            rows.remove(row);
        }

        inserts.sort_by_key(|&(section, row)| (section.index(), row));
        for (section, row) in inserts {
            let task = source
                .section(section)
                .get(row)
                .ok_or(ApplyError::RowOutOfRange { section, row })?;
            let rows = &mut next[section.index()];
            if row > rows.len() {
                return Err(ApplyError::RowOutOfRange { section, row });
            }
            rows.insert(row, task.clone());
        }

        for section in reloaded_sections {
            next[section.index()] = source.section(section).to_vec();
        }

        self.sections = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn task(title: &str, secs: i64) -> Task {
        let at = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Task::new("Home", title, None, at)
    }

    #[test]
    fn cross_section_move_lands_in_new_section() {
        let walk = task("Walk dog", 1);
        let milk = task("Buy milk", 0);
        let before = Partition::from_tasks(&[walk.clone(), milk.clone()]);
        let mut display = DisplayedList::from_partition(&before);

        let mut done = milk.clone();
        done.toggle(Utc::now());
        let after = Partition::from_tasks(&[walk, done]);
        let batch = UiBatch {
            ops: vec![
                ListOp::DeleteRow {
                    section: Section::Pending,
                    row: 1,
                },
                ListOp::InsertRow {
                    section: Section::Completed,
                    row: 0,
                },
            ],
        };

        display.apply(&batch, &after).unwrap();
        assert!(display.matches(&after));
    }

    #[test]
    fn section_reload_copies_source() {
        let mut display = DisplayedList::default();
        let source = Partition::from_tasks(&[task("a", 0), task("b", 1)]);

        display.apply(&UiBatch::full_reload(), &source).unwrap();

        assert_eq!(display.rows(Section::Pending).len(), 2);
        assert!(display.matches(&source));
    }

    #[test]
    fn invalid_batch_changes_nothing() {
        let source = Partition::from_tasks(&[task("a", 0)]);
        let mut display = DisplayedList::from_partition(&source);
        let before = display.clone();

        let batch = UiBatch {
            ops: vec![
                ListOp::ReloadSection(Section::Completed),
                ListOp::DeleteRow {
                    section: Section::Pending,
                    row: 5,
                },
            ],
        };

        assert_matches!(
            display.apply(&batch, &source),
            Err(ApplyError::RowOutOfRange { row: 5, .. })
        );
        assert_eq!(display, before);
    }

    #[test]
    fn reload_of_vanished_task_is_rejected() {
        let gone = task("gone", 0);
        let mut display = DisplayedList::from_partition(&Partition::from_tasks(&[gone.clone()]));
        let batch = UiBatch {
            ops: vec![ListOp::ReloadRow {
                section: Section::Pending,
                row: 0,
            }],
        };

        assert_eq!(
            display.apply(&batch, &Partition::default()),
            Err(ApplyError::MissingTask(gone.id))
        );
    }
}
