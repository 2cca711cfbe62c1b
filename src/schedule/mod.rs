pub mod models;
pub mod store;

pub use models::{Assignment, Event, EventFilter, Note, SyncCounts, SyncedEvent};
pub use store::{ScheduleStore, StoreError};
