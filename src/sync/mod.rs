//! Synchronization engine: reconciles externally-fetched event records with
//! the local store.
//!
//! Records are filtered by the tracked-room allow-list, mapped to
//! [`SyncedEvent`]s with documented defaults, and upserted in one
//! transaction keyed by the external event id. Mapping runs before the
//! store is touched, so a malformed record aborts the batch with nothing
//! committed.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::ministry_platform::RawEvent;
use crate::schedule::{ScheduleStore, StoreError, SyncCounts, SyncedEvent};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid timestamp in {field}: {value:?}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs one sync pass. Records in untracked rooms are discarded without
/// touching the store and without affecting the counts.
pub fn sync_events(
    store: &dyn ScheduleStore,
    records: &[RawEvent],
    tracked_rooms: &BTreeMap<i64, String>,
) -> Result<SyncCounts, SyncError> {
    let mut batch = Vec::new();
    for record in records {
        let Some(room_name) = tracked_rooms.get(&record.room_id) else {
            continue;
        };
        batch.push(map_record(record, room_name)?);
    }

    let counts = store.upsert_synced_events(&batch)?;
    info!(
        "Synced {} events: {} created, {} updated, {} discarded",
        batch.len(),
        counts.created,
        counts.updated,
        records.len() - batch.len()
    );
    Ok(counts)
}

/// Maps one raw record to its stored form. The room display name always
/// comes from the allow-list; the source doesn't supply one.
fn map_record(record: &RawEvent, room_name: &str) -> Result<SyncedEvent, SyncError> {
    Ok(SyncedEvent {
        event_id: record.event_room_id,
        event_title: record.event_title.clone().unwrap_or_default(),
        event_type_id: record.event_type_id,
        room_id: record.room_id,
        room_name: room_name.to_string(),
        event_start_date: parse_optional("Event_Start_Date", &record.event_start_date)?,
        event_end_date: parse_optional("Event_End_Date", &record.event_end_date)?,
        event_reservation_start: parse_optional(
            "Event_Reservation_Start",
            &record.event_reservation_start,
        )?,
        event_reservation_end: parse_optional(
            "Event_Reservation_End",
            &record.event_reservation_end,
        )?,
        minutes_for_setup: record.minutes_for_setup.unwrap_or(0),
        minutes_for_cleanup: record.minutes_for_cleanup.unwrap_or(0),
        cancelled: record.cancelled.unwrap_or(false),
        approved: record.approved.unwrap_or(false),
    })
}

fn parse_optional(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<DateTime<Utc>>, SyncError> {
    match value.as_deref() {
        None => Ok(None),
        Some(raw) => parse_event_timestamp(field, raw).map(Some),
    }
}

/// Parses the source's single timestamp format: ISO-8601 with a literal `Z`
/// suffix. The `Z` is normalized to an explicit zero offset before parsing;
/// anything else (another offset, no suffix, garbage) is an error.
fn parse_event_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, SyncError> {
    let invalid = || SyncError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    };
    let naive_part = raw.strip_suffix('Z').ok_or_else(invalid)?;
    DateTime::parse_from_str(&format!("{}+0000", naive_part), "%Y-%m-%dT%H:%M:%S%.f%z")
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| invalid())
}
