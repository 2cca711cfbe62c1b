//! Event, assignment and note models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::user::User;

/// A mirrored scheduling record. `event_id` is the identifier assigned by
/// the external source and is the reconciliation key for sync upserts; `id`
/// is local. Responses always carry the nested assignments and notes.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub id: i64,
    pub event_id: i64,
    pub event_title: String,
    pub event_type_id: Option<i64>,
    pub room_id: i64,
    pub room_name: String,
    pub event_start_date: Option<DateTime<Utc>>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_reservation_start: Option<DateTime<Utc>>,
    pub event_reservation_end: Option<DateTime<Utc>>,
    pub minutes_for_setup: i64,
    pub minutes_for_cleanup: i64,
    pub cancelled: bool,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignments: Vec<Assignment>,
    pub notes: Vec<Note>,
}

/// Binds one user to one event with a free-text role label ("Tech Lead",
/// "Audio", ...). At most one assignment per (event, user) pair.
#[derive(Clone, Debug, Serialize)]
pub struct Assignment {
    pub id: i64,
    pub event_id: i64,
    pub user: User,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Note {
    pub id: i64,
    pub event_id: i64,
    pub author: User,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for event listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventFilter {
    pub room_id: Option<i64>,
    pub include_cancelled: bool,
}

/// One externally-sourced record after room filtering, field mapping and
/// timestamp parsing — the unit the store upserts.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncedEvent {
    pub event_id: i64,
    pub event_title: String,
    pub event_type_id: Option<i64>,
    pub room_id: i64,
    pub room_name: String,
    pub event_start_date: Option<DateTime<Utc>>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_reservation_start: Option<DateTime<Utc>>,
    pub event_reservation_end: Option<DateTime<Utc>>,
    pub minutes_for_setup: i64,
    pub minutes_for_cleanup: i64,
    pub cancelled: bool,
    pub approved: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub created: usize,
    pub updated: usize,
}
