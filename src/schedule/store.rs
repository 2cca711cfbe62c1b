use thiserror::Error;

use super::models::{Assignment, Event, EventFilter, Note, SyncCounts, SyncedEvent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Event not found")]
    EventNotFound,
    #[error("Note not found")]
    NoteNotFound,
    #[error("Assignment not found")]
    AssignmentNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("User already assigned to this event")]
    AlreadyAssigned,
    #[error("Only the author can modify this note")]
    NotNoteAuthor,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub trait ScheduleStore: Send + Sync {
    /// Returns events matching the filter, ordered by start date ascending
    /// (events without a start date sort last). Cancelled events are
    /// excluded unless the filter asks for them.
    fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, StoreError>;

    /// Returns the event with the given local id.
    fn get_event(&self, event_id: i64) -> Result<Event, StoreError>;

    /// Applies a batch of synced records in ONE transaction: records whose
    /// reconciliation key already exists overwrite every mapped field and
    /// stamp updated_at, the rest are inserted. Nothing is committed if any
    /// record fails.
    fn upsert_synced_events(&self, events: &[SyncedEvent]) -> Result<SyncCounts, StoreError>;

    /// Adds a note authored by `author_id` to an event.
    fn add_note(&self, event_id: i64, author_id: i64, text: &str) -> Result<Note, StoreError>;

    /// Updates a note's text. Only the author may update; passing None
    /// leaves the text (and updated_at) unchanged.
    fn update_note(
        &self,
        event_id: i64,
        note_id: i64,
        author_id: i64,
        text: Option<&str>,
    ) -> Result<Note, StoreError>;

    /// Deletes a note. Only the author may delete.
    fn delete_note(&self, event_id: i64, note_id: i64, author_id: i64) -> Result<(), StoreError>;

    /// Assigns a user to an event. Fails with AlreadyAssigned if the
    /// (event, user) pair already has an assignment.
    fn add_assignment(
        &self,
        event_id: i64,
        user_id: i64,
        role: &str,
    ) -> Result<Assignment, StoreError>;

    /// Updates an assignment's role. Passing None leaves it unchanged.
    fn update_assignment(
        &self,
        event_id: i64,
        assignment_id: i64,
        role: Option<&str>,
    ) -> Result<Assignment, StoreError>;

    /// Removes an assignment.
    fn delete_assignment(&self, event_id: i64, assignment_id: i64) -> Result<(), StoreError>;
}
