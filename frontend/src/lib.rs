//! UI-facing side of the task list: turns live-query batches into row
//! operations for a two-section (pending / completed) list and drives one
//! list screen through its lifecycle. Rendering itself is left to the host.

mod display;
mod reconciler;
mod screen;

pub use display::{ApplyError, DisplayedList};
pub use reconciler::{ListOp, ListReconciler, SectionHeader, UiBatch};
pub use screen::{Msg, ScreenError, ScreenState, TaskListScreen};
