//! SQLite-backed store for users, events, assignments and notes.
//!
//! One connection owns the whole database: the event tables carry foreign
//! keys into the user table, so cascade deletes only work when everything
//! lives in the same file.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::{BASE_DB_VERSION, VERSIONED_SCHEMAS};
use crate::schedule::{
    Assignment, Event, EventFilter, Note, ScheduleStore, StoreError, SyncCounts, SyncedEvent,
};
use crate::user::{
    AuthToken, AuthTokenValue, CredentialHasher, NewUser, PasswordCredentials, User,
    UserAuthCredentialsStore, UserAuthTokenStore, UserStore,
};

fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };

        // Per-connection pragma; cascade deletes depend on it.
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if db_version >= VERSIONED_SCHEMAS.len() as i64 {
            bail!("Database version {} is too new", db_version);
        } else {
            VERSIONED_SCHEMAS
                .get(version)
                .context("Failed to get schema")?
                .validate(&conn)?;
        }

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;

        Ok(())
    }

    fn user_from_row(row: &Row, offset: usize) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(offset)?,
            username: row.get(offset + 1)?,
            email: row.get(offset + 2)?,
            full_name: row.get(offset + 3)?,
            created_at: timestamp_to_datetime(row.get(offset + 4)?),
        })
    }

    fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
        Ok(Event {
            id: row.get(0)?,
            event_id: row.get(1)?,
            event_title: row.get(2)?,
            event_type_id: row.get(3)?,
            room_id: row.get(4)?,
            room_name: row.get(5)?,
            event_start_date: row.get::<_, Option<i64>>(6)?.map(timestamp_to_datetime),
            event_end_date: row.get::<_, Option<i64>>(7)?.map(timestamp_to_datetime),
            event_reservation_start: row.get::<_, Option<i64>>(8)?.map(timestamp_to_datetime),
            event_reservation_end: row.get::<_, Option<i64>>(9)?.map(timestamp_to_datetime),
            minutes_for_setup: row.get(10)?,
            minutes_for_cleanup: row.get(11)?,
            cancelled: row.get(12)?,
            approved: row.get(13)?,
            created_at: timestamp_to_datetime(row.get(14)?),
            updated_at: timestamp_to_datetime(row.get(15)?),
            assignments: Vec::new(),
            notes: Vec::new(),
        })
    }

    fn load_assignments(conn: &Connection, event_id: i64) -> rusqlite::Result<Vec<Assignment>> {
        let mut stmt = conn.prepare(
            "SELECT a.id, a.event_id, a.role, a.created_at, \
                    u.id, u.username, u.email, u.full_name, u.created_at \
             FROM event_assignment a JOIN user u ON u.id = a.user_id \
             WHERE a.event_id = ?1 ORDER BY a.id",
        )?;
        let rows = stmt.query_map(params![event_id], |row| {
            Ok(Assignment {
                id: row.get(0)?,
                event_id: row.get(1)?,
                role: row.get(2)?,
                created_at: timestamp_to_datetime(row.get(3)?),
                user: Self::user_from_row(row, 4)?,
            })
        })?;
        rows.collect()
    }

    fn load_notes(conn: &Connection, event_id: i64) -> rusqlite::Result<Vec<Note>> {
        let mut stmt = conn.prepare(
            "SELECT n.id, n.event_id, n.note, n.created_at, n.updated_at, \
                    u.id, u.username, u.email, u.full_name, u.created_at \
             FROM event_note n JOIN user u ON u.id = n.user_id \
             WHERE n.event_id = ?1 ORDER BY n.id",
        )?;
        let rows = stmt.query_map(params![event_id], |row| {
            Ok(Note {
                id: row.get(0)?,
                event_id: row.get(1)?,
                note: row.get(2)?,
                created_at: timestamp_to_datetime(row.get(3)?),
                updated_at: timestamp_to_datetime(row.get(4)?),
                author: Self::user_from_row(row, 5)?,
            })
        })?;
        rows.collect()
    }

    fn get_note_row(conn: &Connection, note_id: i64) -> rusqlite::Result<Option<Note>> {
        conn.query_row(
            "SELECT n.id, n.event_id, n.note, n.created_at, n.updated_at, \
                    u.id, u.username, u.email, u.full_name, u.created_at \
             FROM event_note n JOIN user u ON u.id = n.user_id \
             WHERE n.id = ?1",
            params![note_id],
            |row| {
                Ok(Note {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    note: row.get(2)?,
                    created_at: timestamp_to_datetime(row.get(3)?),
                    updated_at: timestamp_to_datetime(row.get(4)?),
                    author: Self::user_from_row(row, 5)?,
                })
            },
        )
        .optional()
    }

    fn get_assignment_row(
        conn: &Connection,
        assignment_id: i64,
    ) -> rusqlite::Result<Option<Assignment>> {
        conn.query_row(
            "SELECT a.id, a.event_id, a.role, a.created_at, \
                    u.id, u.username, u.email, u.full_name, u.created_at \
             FROM event_assignment a JOIN user u ON u.id = a.user_id \
             WHERE a.id = ?1",
            params![assignment_id],
            |row| {
                Ok(Assignment {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    role: row.get(2)?,
                    created_at: timestamp_to_datetime(row.get(3)?),
                    user: Self::user_from_row(row, 4)?,
                })
            },
        )
        .optional()
    }

    fn event_exists(conn: &Connection, event_id: i64) -> rusqlite::Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM event WHERE id = ?1",
            params![event_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

const EVENT_COLUMNS: &str = "id, event_id, event_title, event_type_id, room_id, room_name, \
     event_start_date, event_end_date, event_reservation_start, event_reservation_end, \
     minutes_for_setup, minutes_for_cleanup, cancelled, approved, created_at, updated_at";

impl ScheduleStore for SqliteStore {
    fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {} FROM event WHERE 1=1", EVENT_COLUMNS);
        let mut bindings: Vec<i64> = Vec::new();
        if let Some(room_id) = filter.room_id {
            sql.push_str(" AND room_id = ?");
            bindings.push(room_id);
        }
        if !filter.include_cancelled {
            sql.push_str(" AND cancelled = 0");
        }
        sql.push_str(" ORDER BY event_start_date IS NULL, event_start_date, id");

        let mut stmt = conn.prepare(&sql)?;
        let mut events = stmt
            .query_map(params_from_iter(bindings), Self::event_from_row)?
            .collect::<rusqlite::Result<Vec<Event>>>()?;
        for event in events.iter_mut() {
            event.assignments = Self::load_assignments(&conn, event.id)?;
            event.notes = Self::load_notes(&conn, event.id)?;
        }
        Ok(events)
    }

    fn get_event(&self, event_id: i64) -> Result<Event, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut event = conn
            .query_row(
                &format!("SELECT {} FROM event WHERE id = ?1", EVENT_COLUMNS),
                params![event_id],
                Self::event_from_row,
            )
            .optional()?
            .ok_or(StoreError::EventNotFound)?;
        event.assignments = Self::load_assignments(&conn, event.id)?;
        event.notes = Self::load_notes(&conn, event.id)?;
        Ok(event)
    }

    fn upsert_synced_events(&self, events: &[SyncedEvent]) -> Result<SyncCounts, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp();
        let mut counts = SyncCounts::default();

        for event in events {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM event WHERE event_id = ?1",
                    params![event.event_id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE event SET event_title = ?1, event_type_id = ?2, room_id = ?3, \
                         room_name = ?4, event_start_date = ?5, event_end_date = ?6, \
                         event_reservation_start = ?7, event_reservation_end = ?8, \
                         minutes_for_setup = ?9, minutes_for_cleanup = ?10, cancelled = ?11, \
                         approved = ?12, updated_at = ?13 WHERE id = ?14",
                        params![
                            event.event_title,
                            event.event_type_id,
                            event.room_id,
                            event.room_name,
                            event.event_start_date.map(|dt| dt.timestamp()),
                            event.event_end_date.map(|dt| dt.timestamp()),
                            event.event_reservation_start.map(|dt| dt.timestamp()),
                            event.event_reservation_end.map(|dt| dt.timestamp()),
                            event.minutes_for_setup,
                            event.minutes_for_cleanup,
                            event.cancelled,
                            event.approved,
                            now,
                            id,
                        ],
                    )?;
                    counts.updated += 1;
                }
                None => {
                    tx.execute(
                        "INSERT INTO event (event_id, event_title, event_type_id, room_id, \
                         room_name, event_start_date, event_end_date, event_reservation_start, \
                         event_reservation_end, minutes_for_setup, minutes_for_cleanup, \
                         cancelled, approved, created_at, updated_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                        params![
                            event.event_id,
                            event.event_title,
                            event.event_type_id,
                            event.room_id,
                            event.room_name,
                            event.event_start_date.map(|dt| dt.timestamp()),
                            event.event_end_date.map(|dt| dt.timestamp()),
                            event.event_reservation_start.map(|dt| dt.timestamp()),
                            event.event_reservation_end.map(|dt| dt.timestamp()),
                            event.minutes_for_setup,
                            event.minutes_for_cleanup,
                            event.cancelled,
                            event.approved,
                            now,
                            now,
                        ],
                    )?;
                    counts.created += 1;
                }
            }
        }

        tx.commit()?;
        Ok(counts)
    }

    fn add_note(&self, event_id: i64, author_id: i64, text: &str) -> Result<Note, StoreError> {
        let conn = self.conn.lock().unwrap();
        if !Self::event_exists(&conn, event_id)? {
            return Err(StoreError::EventNotFound);
        }
        conn.execute(
            "INSERT INTO event_note (event_id, user_id, note) VALUES (?1, ?2, ?3)",
            params![event_id, author_id, text],
        )?;
        let note_id = conn.last_insert_rowid();
        Self::get_note_row(&conn, note_id)?.ok_or(StoreError::NoteNotFound)
    }

    fn update_note(
        &self,
        event_id: i64,
        note_id: i64,
        author_id: i64,
        text: Option<&str>,
    ) -> Result<Note, StoreError> {
        let conn = self.conn.lock().unwrap();
        let note = Self::get_note_row(&conn, note_id)?
            .filter(|note| note.event_id == event_id)
            .ok_or(StoreError::NoteNotFound)?;
        if note.author.id != author_id {
            return Err(StoreError::NotNoteAuthor);
        }
        if let Some(text) = text {
            conn.execute(
                "UPDATE event_note SET note = ?1, updated_at = ?2 WHERE id = ?3",
                params![text, Utc::now().timestamp(), note_id],
            )?;
        }
        Self::get_note_row(&conn, note_id)?.ok_or(StoreError::NoteNotFound)
    }

    fn delete_note(&self, event_id: i64, note_id: i64, author_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let note = Self::get_note_row(&conn, note_id)?
            .filter(|note| note.event_id == event_id)
            .ok_or(StoreError::NoteNotFound)?;
        if note.author.id != author_id {
            return Err(StoreError::NotNoteAuthor);
        }
        conn.execute("DELETE FROM event_note WHERE id = ?1", params![note_id])?;
        Ok(())
    }

    fn add_assignment(
        &self,
        event_id: i64,
        user_id: i64,
        role: &str,
    ) -> Result<Assignment, StoreError> {
        let conn = self.conn.lock().unwrap();
        if !Self::event_exists(&conn, event_id)? {
            return Err(StoreError::EventNotFound);
        }
        let user_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        if user_count == 0 {
            return Err(StoreError::UserNotFound);
        }
        // The UNIQUE (event_id, user_id) constraint is the dedup guard;
        // the violation, not a prior read, signals the conflict.
        let inserted = conn.execute(
            "INSERT INTO event_assignment (event_id, user_id, role) VALUES (?1, ?2, ?3)",
            params![event_id, user_id, role],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if Self::is_constraint_violation(&err) => {
                return Err(StoreError::AlreadyAssigned)
            }
            Err(err) => return Err(err.into()),
        }
        let assignment_id = conn.last_insert_rowid();
        Self::get_assignment_row(&conn, assignment_id)?.ok_or(StoreError::AssignmentNotFound)
    }

    fn update_assignment(
        &self,
        event_id: i64,
        assignment_id: i64,
        role: Option<&str>,
    ) -> Result<Assignment, StoreError> {
        let conn = self.conn.lock().unwrap();
        let assignment = Self::get_assignment_row(&conn, assignment_id)?
            .filter(|assignment| assignment.event_id == event_id)
            .ok_or(StoreError::AssignmentNotFound)?;
        if let Some(role) = role {
            conn.execute(
                "UPDATE event_assignment SET role = ?1 WHERE id = ?2",
                params![role, assignment.id],
            )?;
        }
        Self::get_assignment_row(&conn, assignment_id)?.ok_or(StoreError::AssignmentNotFound)
    }

    fn delete_assignment(&self, event_id: i64, assignment_id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::get_assignment_row(&conn, assignment_id)?
            .filter(|assignment| assignment.event_id == event_id)
            .ok_or(StoreError::AssignmentNotFound)?;
        conn.execute(
            "DELETE FROM event_assignment WHERE id = ?1",
            params![assignment_id],
        )?;
        Ok(())
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, new_user: &NewUser) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (username, email, full_name) VALUES (?1, ?2, ?3)",
            params![new_user.username, new_user.email, new_user.full_name],
        )
        .with_context(|| format!("Failed to create user {}", new_user.username))?;
        Ok(conn.last_insert_rowid())
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, username, email, full_name, created_at FROM user WHERE id = ?1",
                params![user_id],
                |row| Self::user_from_row(row, 0),
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, username, email, full_name, created_at FROM user WHERE username = ?1",
                params![username],
                |row| Self::user_from_row(row, 0),
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, username, email, full_name, created_at FROM user ORDER BY username",
        )?;
        let users = stmt
            .query_map([], |row| Self::user_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<User>>>()?;
        Ok(users)
    }

    fn delete_user(&self, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM user WHERE id = ?1", params![user_id])?;
        Ok(deleted > 0)
    }
}

impl UserAuthCredentialsStore for SqliteStore {
    fn get_password_credentials(&self, username: &str) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        let credentials = conn
            .query_row(
                "SELECT c.user_id, c.salt, c.hash, c.hasher, c.created_at \
                 FROM user_password_credentials c JOIN user u ON u.id = c.user_id \
                 WHERE u.username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        match credentials {
            None => Ok(None),
            Some((user_id, salt, hash, hasher, created_at)) => Ok(Some(PasswordCredentials {
                user_id,
                salt,
                hash,
                hasher: CredentialHasher::from_str(&hasher)?,
                created_at: timestamp_to_datetime(created_at),
            })),
        }
    }

    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (user_id) DO UPDATE SET \
             salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher, \
             created_at = excluded.created_at",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                credentials.created_at.timestamp(),
            ],
        )?;
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteStore {
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT user_id, value, created_at, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                |row| {
                    Ok(AuthToken {
                        user_id: row.get(0)?,
                        value: AuthTokenValue(row.get(1)?),
                        created_at: timestamp_to_datetime(row.get(2)?),
                        last_used: row.get::<_, Option<i64>>(3)?.map(timestamp_to_datetime),
                    })
                },
            )
            .optional()?;
        Ok(token)
    }

    fn add_auth_token(&self, token: &AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created_at) VALUES (?1, ?2, ?3)",
            params![token.user_id, token.value.0, token.created_at.timestamp()],
        )?;
        Ok(())
    }

    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let token = self.get_auth_token(value)?;
        if token.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM auth_token WHERE value = ?1", params![value.0])?;
        }
        Ok(token)
    }

    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![Utc::now().timestamp(), value.0],
        )?;
        Ok(())
    }
}
