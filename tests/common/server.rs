//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database and its own stub
//! Ministry Platform upstream.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use parish_schedule_server::config::{tracked_rooms, MinistryPlatformConfig};
use parish_schedule_server::server::server::make_app;
use parish_schedule_server::server::{RequestsLoggingLevel, ServerConfig};
use parish_schedule_server::{MinistryPlatformClient, SqliteStore};

use super::fixtures::{create_test_db_with_users, default_source_payload};

/// Test server instance with isolated database and stub upstream.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Store handle for direct database access in tests
    pub store: Arc<SqliteStore>,

    // Keep the temp dir alive until drop
    _temp_db_dir: TempDir,
}

impl TestServer {
    /// Spawns a test server whose stub upstream serves the default payload.
    pub async fn spawn() -> Self {
        Self::spawn_with_options(vec![default_source_payload()], Some("test-token".into())).await
    }

    /// Spawns a test server whose stub upstream serves the given payloads in
    /// order, repeating the last one.
    pub async fn spawn_with_source_payloads(payloads: Vec<Value>) -> Self {
        Self::spawn_with_options(payloads, Some("test-token".into())).await
    }

    /// Spawns a test server with no bearer token configured, so sync calls
    /// fail before reaching the network.
    pub async fn spawn_without_bearer_token() -> Self {
        Self::spawn_with_options(vec![default_source_payload()], None).await
    }

    async fn spawn_with_options(payloads: Vec<Value>, bearer_token: Option<String>) -> Self {
        assert!(!payloads.is_empty(), "stub upstream needs a payload");

        let (temp_db_dir, store) = create_test_db_with_users();
        let source_url = spawn_stub_event_source(payloads).await;

        let event_source = MinistryPlatformClient::new(MinistryPlatformConfig {
            api_url: source_url,
            bearer_token,
        })
        .expect("Failed to build stub event source client");

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port: 0,
        };
        let app = make_app(
            config,
            store.clone(),
            store.clone(),
            Arc::new(event_source),
            tracked_rooms(),
        )
        .expect("Failed to build app");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test port");
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://127.0.0.1:{}", port);
        wait_until_ready(&base_url).await;

        TestServer {
            base_url,
            port,
            store,
            _temp_db_dir: temp_db_dir,
        }
    }
}

/// Spawns a stub Ministry Platform endpoint that answers POSTs with the
/// given payloads in order, repeating the last one forever.
async fn spawn_stub_event_source(payloads: Vec<Value>) -> String {
    type Payloads = Arc<Mutex<Vec<Value>>>;

    async fn serve_payload(State(payloads): State<Payloads>) -> Json<Value> {
        let mut payloads = payloads.lock().unwrap();
        let payload = if payloads.len() > 1 {
            payloads.remove(0)
        } else {
            payloads[0].clone()
        };
        Json(payload)
    }

    let app = Router::new()
        .route("/events", post(serve_payload))
        .with_state(Arc::new(Mutex::new(payloads)));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub upstream port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/events", addr)
}

async fn wait_until_ready(base_url: &str) {
    for _ in 0..50 {
        if let Ok(response) = reqwest::get(base_url).await {
            if response.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Test server at {} did not become ready", base_url);
}
