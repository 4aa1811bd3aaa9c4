pub mod clock;
pub mod config;
pub mod query;
pub mod repository;
pub mod store;
pub mod widget;

pub use clock::{Clock, SteppingClock, SystemClock};
pub use query::{ChangeHandler, TaskQuery};
pub use repository::{CategorySummary, TaskRepository};
pub use store::{InMemoryStore, ReadOnly, RedisStore, Store, StoreError};
pub use widget::{summarize, RefreshHandle, WidgetRefresher};
