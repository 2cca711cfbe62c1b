//! End-to-end tests for the event listing and detail endpoints.
//!
//! Events only enter the store through sync, so every test starts by
//! syncing the stub upstream's payload.

mod common;

use common::{
    TestClient, TestServer, CANCELLED_EVENT, SANCTUARY_ROOM, SERVICE_EVENT, SMITH_ROOM,
    UNTRACKED_EVENT, YOUTH_EVENT,
};
use reqwest::StatusCode;
use serde_json::Value;

async fn synced_events(client: &TestClient, include_cancelled: bool) -> Vec<Value> {
    let response = client.sync_events().await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = client.get_events_filtered(None, include_cancelled).await;
    assert_eq!(response.status(), StatusCode::OK);
    let events: Value = response.json().await.unwrap();
    events.as_array().unwrap().clone()
}

#[tokio::test]
async fn test_list_events_excludes_cancelled_by_default() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let events = synced_events(&client, false).await;

    let external_ids: Vec<i64> = events
        .iter()
        .map(|event| event["event_id"].as_i64().unwrap())
        .collect();
    assert_eq!(external_ids, vec![SERVICE_EVENT, YOUTH_EVENT]);
}

#[tokio::test]
async fn test_list_events_can_include_cancelled() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let events = synced_events(&client, true).await;

    let external_ids: Vec<i64> = events
        .iter()
        .map(|event| event["event_id"].as_i64().unwrap())
        .collect();
    // Ordered by start date ascending; the untracked-room record was
    // discarded during sync.
    assert_eq!(external_ids, vec![SERVICE_EVENT, YOUTH_EVENT, CANCELLED_EVENT]);
    assert!(!external_ids.contains(&UNTRACKED_EVENT));
}

#[tokio::test]
async fn test_list_events_filtered_by_room() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.sync_events().await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get_events_filtered(Some(SMITH_ROOM), false)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let events: Value = response.json().await.unwrap();
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_id"], YOUTH_EVENT);
    assert_eq!(events[0]["room_name"], "Smith");
}

#[tokio::test]
async fn test_event_detail_carries_mapped_fields_and_empty_nests() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let event_id = client.sync_and_find_event(SERVICE_EVENT).await;
    let response = client.get_event(event_id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let event: Value = response.json().await.unwrap();
    assert_eq!(event["event_id"], SERVICE_EVENT);
    assert_eq!(event["event_title"], "Sunday Service");
    assert_eq!(event["room_id"], SANCTUARY_ROOM);
    assert_eq!(event["room_name"], "Sanctuary");
    assert_eq!(event["event_start_date"], "2024-01-07T09:00:00Z");
    assert_eq!(event["minutes_for_setup"], 30);
    assert_eq!(event["minutes_for_cleanup"], 15);
    assert_eq!(event["cancelled"], false);
    assert_eq!(event["approved"], true);
    assert_eq!(event["assignments"], serde_json::json!([]));
    assert_eq!(event["notes"], serde_json::json!([]));
}

#[tokio::test]
async fn test_get_missing_event_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_event(424242).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
