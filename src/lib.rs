//! Parish Schedule Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod ministry_platform;
pub mod schedule;
pub mod server;
pub mod sqlite_persistence;
pub mod sync;
pub mod user;

// Re-export commonly used types for convenience
pub use ministry_platform::MinistryPlatformClient;
pub use schedule::ScheduleStore;
pub use server::{run_server, RequestsLoggingLevel};
pub use sqlite_persistence::SqliteStore;
pub use user::UserStore;
