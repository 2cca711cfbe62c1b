//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When routes or
//! request formats change, update only this file.

use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

use super::constants::*;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client pre-authenticated as the regular test user.
    pub async fn authenticated(base_url: String) -> Self {
        Self::login_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the second test user.
    pub async fn authenticated_second(base_url: String) -> Self {
        Self::login_as(base_url, SECOND_USER, SECOND_PASS).await
    }

    async fn login_as(base_url: String, username: &str, password: &str) -> Self {
        let client = Self::new(base_url);
        let response = client.login(username, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Test user authentication failed: {:?}",
            response.text().await
        );
        client
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/v1/auth/login", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request failed")
    }

    pub async fn logout(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/logout", self.base_url))
            .send()
            .await
            .expect("logout request failed")
    }

    pub async fn me(&self) -> Response {
        self.client
            .get(format!("{}/v1/auth/me", self.base_url))
            .send()
            .await
            .expect("me request failed")
    }

    pub async fn get_events(&self) -> Response {
        self.client
            .get(format!("{}/v1/events", self.base_url))
            .send()
            .await
            .expect("get events request failed")
    }

    pub async fn get_events_filtered(
        &self,
        room_id: Option<i64>,
        include_cancelled: bool,
    ) -> Response {
        let mut request = self.client.get(format!("{}/v1/events", self.base_url));
        if let Some(room_id) = room_id {
            request = request.query(&[("room_id", room_id.to_string())]);
        }
        if include_cancelled {
            request = request.query(&[("include_cancelled", "true")]);
        }
        request.send().await.expect("get events request failed")
    }

    pub async fn get_event(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/events/{}", self.base_url, id))
            .send()
            .await
            .expect("get event request failed")
    }

    pub async fn add_note(&self, event_id: i64, body: Value) -> Response {
        self.client
            .post(format!("{}/v1/events/{}/notes", self.base_url, event_id))
            .json(&body)
            .send()
            .await
            .expect("add note request failed")
    }

    pub async fn update_note(&self, event_id: i64, note_id: i64, body: Value) -> Response {
        self.client
            .put(format!(
                "{}/v1/events/{}/notes/{}",
                self.base_url, event_id, note_id
            ))
            .json(&body)
            .send()
            .await
            .expect("update note request failed")
    }

    pub async fn delete_note(&self, event_id: i64, note_id: i64) -> Response {
        self.client
            .delete(format!(
                "{}/v1/events/{}/notes/{}",
                self.base_url, event_id, note_id
            ))
            .send()
            .await
            .expect("delete note request failed")
    }

    pub async fn add_assignment(&self, event_id: i64, body: Value) -> Response {
        self.client
            .post(format!(
                "{}/v1/events/{}/assignments",
                self.base_url, event_id
            ))
            .json(&body)
            .send()
            .await
            .expect("add assignment request failed")
    }

    pub async fn update_assignment(
        &self,
        event_id: i64,
        assignment_id: i64,
        body: Value,
    ) -> Response {
        self.client
            .put(format!(
                "{}/v1/events/{}/assignments/{}",
                self.base_url, event_id, assignment_id
            ))
            .json(&body)
            .send()
            .await
            .expect("update assignment request failed")
    }

    pub async fn delete_assignment(&self, event_id: i64, assignment_id: i64) -> Response {
        self.client
            .delete(format!(
                "{}/v1/events/{}/assignments/{}",
                self.base_url, event_id, assignment_id
            ))
            .send()
            .await
            .expect("delete assignment request failed")
    }

    pub async fn sync_events(&self) -> Response {
        self.client
            .post(format!("{}/v1/sync/events", self.base_url))
            .send()
            .await
            .expect("sync request failed")
    }

    pub async fn get_rooms(&self) -> Response {
        self.client
            .get(format!("{}/v1/sync/rooms", self.base_url))
            .send()
            .await
            .expect("get rooms request failed")
    }

    pub async fn list_users(&self) -> Response {
        self.client
            .get(format!("{}/v1/users", self.base_url))
            .send()
            .await
            .expect("list users request failed")
    }

    pub async fn get_user(&self, id: i64) -> Response {
        self.client
            .get(format!("{}/v1/users/{}", self.base_url, id))
            .send()
            .await
            .expect("get user request failed")
    }

    /// Syncs the default payload and returns the local id of the event with
    /// the given external id.
    pub async fn sync_and_find_event(&self, external_event_id: i64) -> i64 {
        let response = self.sync_events().await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        self.find_event(external_event_id).await
    }

    /// Returns the local id of the event with the given external id.
    pub async fn find_event(&self, external_event_id: i64) -> i64 {
        let response = self.get_events_filtered(None, true).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let events: Value = response.json().await.expect("events response not json");
        events
            .as_array()
            .expect("events response not a list")
            .iter()
            .find(|event| event["event_id"] == json!(external_event_id))
            .unwrap_or_else(|| panic!("no event with external id {}", external_event_id))["id"]
            .as_i64()
            .expect("event id not an integer")
    }
}
