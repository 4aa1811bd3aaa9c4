use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Task;

/// Progress counters shown by the home-screen widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSummary {
    pub generated_at: DateTime<Utc>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetStatus {
    Empty,
    AllDone,
    Remaining(usize),
}

impl WidgetSummary {
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            total_tasks: 0,
            completed_tasks: 0,
        }
    }

    pub fn from_tasks<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let (total_tasks, completed_tasks) = tasks.into_iter().fold((0, 0), |(total, done), task| {
            (total + 1, done + usize::from(task.is_completed))
        });
        Self {
            generated_at,
            total_tasks,
            completed_tasks,
        }
    }

    /// Fraction of tasks completed, `0.0` when there are none.
    pub fn completion_ratio(&self) -> f64 {
        if self.total_tasks == 0 {
            return 0.0;
        }
        self.completed_tasks as f64 / self.total_tasks as f64
    }

    pub fn completion_percent(&self) -> u8 {
        (self.completion_ratio() * 100.0).floor() as u8
    }

    pub fn remaining(&self) -> usize {
        self.total_tasks.saturating_sub(self.completed_tasks)
    }

    pub fn status(&self) -> WidgetStatus {
        match self.remaining() {
            _ if self.total_tasks == 0 => WidgetStatus::Empty,
            0 => WidgetStatus::AllDone,
            n => WidgetStatus::Remaining(n),
        }
    }
}
