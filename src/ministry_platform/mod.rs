//! Client for the Ministry Platform events API, the external system of
//! record for scheduling data.

mod client;
mod models;

pub use client::{FetchError, MinistryPlatformClient};
pub use models::RawEvent;
