//! Test data fixtures: a seeded database and canned source payloads.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use parish_schedule_server::user::{
    NewUser, PasswordCredentials, UserAuthCredentialsStore, UserStore,
};
use parish_schedule_server::SqliteStore;

use super::constants::*;

/// Creates a temporary database with the two test users.
pub fn create_test_db_with_users() -> (TempDir, Arc<SqliteStore>) {
    let temp_dir = TempDir::new().expect("Failed to create temp db dir");
    let store =
        Arc::new(SqliteStore::open(temp_dir.path().join("schedule.db")).expect("Failed to open db"));

    for (username, password) in [(TEST_USER, TEST_PASS), (SECOND_USER, SECOND_PASS)] {
        let user_id = store
            .create_user(&NewUser {
                username: username.to_string(),
                email: format!("{}@standrew.example", username),
                full_name: format!("Test {}", username),
            })
            .expect("Failed to create test user");
        let credentials = PasswordCredentials::from_plaintext(user_id, password)
            .expect("Failed to hash test password");
        store
            .set_password_credentials(&credentials)
            .expect("Failed to store test credentials");
    }

    (temp_dir, store)
}

/// One upstream record in wire format.
pub fn source_record(event_room_id: i64, room_id: i64, title: &str, start: &str) -> Value {
    json!({
        "Event_Room_ID": event_room_id,
        "Room_ID": room_id,
        "Event_Title": title,
        "Event_Type_ID": 7,
        "Event_Start_Date": start,
        "Event_End_Date": "2024-01-07T11:00:00Z",
        "Event_Reservation_Start": "2024-01-07T08:00:00Z",
        "Event_Reservation_End": "2024-01-07T12:00:00Z",
        "Minutes_for_Setup": 30,
        "Minutes_for_Cleanup": 15,
        "Cancelled": false,
        "_Approved": true,
    })
}

/// The default upstream payload: three records in tracked rooms (one of
/// them cancelled) plus one in an untracked room, wrapped in the source's
/// single-element outer list.
pub fn default_source_payload() -> Value {
    let mut cancelled = source_record(
        CANCELLED_EVENT,
        SANCTUARY_ROOM,
        "Cancelled Meeting",
        "2024-01-09T09:00:00Z",
    );
    cancelled["Cancelled"] = json!(true);

    json!([[
        source_record(
            SERVICE_EVENT,
            SANCTUARY_ROOM,
            "Sunday Service",
            "2024-01-07T09:00:00Z",
        ),
        source_record(
            YOUTH_EVENT,
            SMITH_ROOM,
            "Youth Group",
            "2024-01-08T18:00:00Z",
        ),
        cancelled,
        source_record(
            UNTRACKED_EVENT,
            UNTRACKED_ROOM,
            "Offsite Retreat",
            "2024-01-10T09:00:00Z",
        ),
    ]])
}
