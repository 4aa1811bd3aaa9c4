use backend::ChangeHandler;
use serde::{Deserialize, Serialize};
use shared::{Change, ChangeBatch, Partition, RowLocation, Section, Task};
use uuid::Uuid;

/// One list-view operation.
///
/// `DeleteRow` and `ReloadRow` address rows as they were before the batch,
/// `InsertRow` addresses rows as they are after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListOp {
    DeleteRow { section: Section, row: usize },
    InsertRow { section: Section, row: usize },
    ReloadRow { section: Section, row: usize },
    ReloadSection(Section),
}

/// Operations produced for one notification, applied all together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiBatch {
    pub ops: Vec<ListOp>,
}

impl UiBatch {
    pub fn full_reload() -> Self {
        Self {
            ops: Section::ALL.into_iter().map(ListOp::ReloadSection).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub section: Section,
    pub title: &'static str,
    pub count: usize,
    /// Empty sections get a zero-height header.
    pub visible: bool,
}

/// Keeps the displayed pending/completed partition and translates change
/// batches into [`UiBatch`]es.
///
/// Completion toggles are the only fine-grained case: the row moves across
/// sections as a delete/insert pair, or is reloaded in place when it stays
/// in its section. Anything that changes membership reloads both sections.
#[derive(Debug, Default)]
pub struct ListReconciler {
    partition: Partition,
    in_flight: Vec<Change>,
    delivered: Option<UiBatch>,
}

impl ListReconciler {
    pub fn new(snapshot: &[Task]) -> Self {
        Self {
            partition: Partition::from_tasks(snapshot),
            ..Self::default()
        }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn header(&self, section: Section) -> SectionHeader {
        let count = self.partition.section(section).len();
        SectionHeader {
            section,
            title: section.title(),
            count,
            visible: count > 0,
        }
    }

    pub fn headers(&self) -> [SectionHeader; 2] {
        Section::ALL.map(|section| self.header(section))
    }

    pub fn reconcile(&mut self, batch: &ChangeBatch) -> UiBatch {
        self.reconcile_changes(&batch.changes, &batch.snapshot)
    }

    /// Takes the batch produced by the last completed
    /// `begin_changes`..`end_changes` delivery.
    pub fn take_delivered(&mut self) -> Option<UiBatch> {
        self.delivered.take()
    }

    fn reconcile_changes(&mut self, changes: &[Change], snapshot: &[Task]) -> UiBatch {
        let next = Partition::from_tasks(snapshot);

        let batch = if changes.is_empty() {
            UiBatch::default()
        } else if changes.iter().any(Change::is_structural) {
            UiBatch::full_reload()
        } else {
            let updated = changes.iter().filter_map(|change| match change {
                Change::Update { id, .. } => Some(*id),
                _ => None,
            });
            row_ops(&self.partition, &next, updated)
        };

        tracing::debug!(
            changes = changes.len(),
            ops = batch.ops.len(),
            pending = next.pending().len(),
            completed = next.completed().len(),
            "Reconciled list"
        );
        self.partition = next;
        batch
    }
}

impl ChangeHandler for ListReconciler {
    fn begin_changes(&mut self) {
        self.in_flight.clear();
    }

    fn on_change(&mut self, change: &Change) {
        self.in_flight.push(change.clone());
    }

    fn end_changes(&mut self, snapshot: &[Task]) {
        let changes = std::mem::take(&mut self.in_flight);
        self.delivered = Some(self.reconcile_changes(&changes, snapshot));
    }
}

/// Deletes (descending), then inserts (ascending), then reloads.
fn row_ops(old: &Partition, new: &Partition, updated: impl Iterator<Item = Uuid>) -> UiBatch {
    let mut deletes: Vec<RowLocation> = Vec::new();
    let mut inserts: Vec<RowLocation> = Vec::new();
    let mut reloads: Vec<RowLocation> = Vec::new();

    for id in updated {
        match (old.locate(id), new.locate(id)) {
            (Some(from), Some(to)) if from.section != to.section => {
                deletes.push(from);
                inserts.push(to);
            }
            (Some(from), Some(_)) => reloads.push(from),
            _ => tracing::debug!(task_id = %id, "Updated task is not on screen"),
        }
    }

    let key = |loc: &RowLocation| (loc.section.index(), loc.row);
    deletes.sort_by_key(|loc| std::cmp::Reverse(key(loc)));
    inserts.sort_by_key(key);
    reloads.sort_by_key(key);
    reloads.dedup();

    let ops = deletes
        .into_iter()
        .map(|RowLocation { section, row }| ListOp::DeleteRow { section, row })
        .chain(
            inserts
                .into_iter()
                .map(|RowLocation { section, row }| ListOp::InsertRow { section, row }),
        )
        .chain(
            reloads
                .into_iter()
                .map(|RowLocation { section, row }| ListOp::ReloadRow { section, row }),
        )
        .collect();
    UiBatch { ops }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn task(title: &str, secs: i64) -> Task {
        Task::new("Home", title, None, at(secs))
    }

    fn batch(changes: Vec<Change>, snapshot: &[Task]) -> ChangeBatch {
        ChangeBatch {
            category_name: "Home".into(),
            changes,
            snapshot: snapshot.to_vec(),
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn completing_a_task_moves_it_across_sections() {
        let walk = task("Walk dog", 1);
        let milk = task("Buy milk", 0);
        let mut reconciler = ListReconciler::new(&[walk.clone(), milk.clone()]);

        let mut done = milk.clone();
        done.toggle(at(10));
        let ui = reconciler.reconcile(&batch(
            vec![Change::Update { id: milk.id, index: 1 }],
            &[walk.clone(), done],
        ));

        assert_eq!(
            ui.ops,
            vec![
                ListOp::DeleteRow {
                    section: Section::Pending,
                    row: 1
                },
                ListOp::InsertRow {
                    section: Section::Completed,
                    row: 0
                },
            ]
        );
        assert_eq!(titles(reconciler.partition().pending()), ["Walk dog"]);
        assert_eq!(titles(reconciler.partition().completed()), ["Buy milk"]);
    }

    #[test]
    fn same_section_update_reloads_in_place() {
        let milk = task("Buy milk", 0);
        let mut reconciler = ListReconciler::new(&[milk.clone()]);

        let mut edited = milk.clone();
        edited.due_date = Some(at(0) + Duration::days(1));
        let ui = reconciler.reconcile(&batch(
            vec![Change::Update { id: milk.id, index: 0 }],
            &[edited],
        ));

        assert_eq!(
            ui.ops,
            vec![ListOp::ReloadRow {
                section: Section::Pending,
                row: 0
            }]
        );
    }

    #[test]
    fn membership_changes_reload_both_sections() {
        let milk = task("Buy milk", 0);
        let walk = task("Walk dog", 1);
        let mut reconciler = ListReconciler::new(&[milk.clone()]);

        let ui = reconciler.reconcile(&batch(
            vec![Change::Insert {
                task: walk.clone(),
                index: 0,
            }],
            &[walk, milk],
        ));

        assert_eq!(ui, UiBatch::full_reload());
        assert_eq!(reconciler.partition().pending().len(), 2);
    }

    #[test]
    fn mixed_batch_with_structural_change_is_a_bulk_refresh() {
        let milk = task("Buy milk", 0);
        let walk = task("Walk dog", 1);
        let mut reconciler = ListReconciler::new(&[walk.clone(), milk.clone()]);

        let mut done = milk.clone();
        done.toggle(at(10));
        let ui = reconciler.reconcile(&batch(
            vec![
                Change::Delete { id: walk.id, index: 0 },
                Change::Update { id: milk.id, index: 1 },
            ],
            &[done],
        ));

        assert_eq!(ui, UiBatch::full_reload());
    }

    #[test]
    fn several_toggles_order_deletes_before_inserts() {
        let a = task("a", 0);
        let b = task("b", 1);
        let c = task("c", 2);
        let mut reconciler = ListReconciler::new(&[c.clone(), b.clone(), a.clone()]);

        let mut a_done = a.clone();
        a_done.toggle(at(10));
        let mut c_done = c.clone();
        c_done.toggle(at(11));
        let ui = reconciler.reconcile(&batch(
            vec![
                Change::Update { id: c.id, index: 0 },
                Change::Update { id: a.id, index: 2 },
            ],
            &[c_done, b, a_done],
        ));

        assert_eq!(
            ui.ops,
            vec![
                ListOp::DeleteRow {
                    section: Section::Pending,
                    row: 2
                },
                ListOp::DeleteRow {
                    section: Section::Pending,
                    row: 0
                },
                ListOp::InsertRow {
                    section: Section::Completed,
                    row: 0
                },
                ListOp::InsertRow {
                    section: Section::Completed,
                    row: 1
                },
            ]
        );
        assert_eq!(titles(reconciler.partition().completed()), ["c", "a"]);
    }

    #[test]
    fn empty_sections_hide_their_headers() {
        let reconciler = ListReconciler::new(&[task("Buy milk", 0)]);
        let [pending, completed] = reconciler.headers();

        assert!(pending.visible);
        assert_eq!(pending.count, 1);
        assert!(!completed.visible);
        assert_eq!(completed.count, 0);
        assert_eq!(completed.title, "Completed");
    }

    #[test]
    fn handler_delivery_matches_direct_reconcile() {
        let milk = task("Buy milk", 0);
        let mut reconciler = ListReconciler::new(&[milk.clone()]);
        let mut done = milk.clone();
        done.toggle(at(3));

        let update = Change::Update { id: milk.id, index: 0 };
        reconciler.begin_changes();
        reconciler.on_change(&update);
        reconciler.end_changes(&[done]);

        let ui = reconciler.take_delivered().unwrap();
        assert_eq!(ui.ops.len(), 2);
        assert!(reconciler.take_delivered().is_none());
    }

    #[test]
    fn empty_batch_produces_no_ops() {
        let milk = task("Buy milk", 0);
        let mut reconciler = ListReconciler::new(&[milk.clone()]);
        assert!(reconciler.reconcile(&batch(vec![], &[milk])).is_empty());
    }
}
