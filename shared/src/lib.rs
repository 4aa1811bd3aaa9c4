mod change;
mod error;
mod model;
mod partition;
mod summary;

pub use change::{Change, ChangeBatch, StoreChange};
pub use error::TodoError;
pub use model::{normalize_name, sort_by_creation, Category, Task, TaskFilter};
pub use partition::{Partition, RowLocation, Section};
pub use summary::{WidgetStatus, WidgetSummary};
