use anyhow::Result;
use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use tracing::{debug, error, info};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::{log_requests, state::*, RequestsLoggingLevel, ServerConfig};
use crate::ministry_platform::MinistryPlatformClient;
use crate::schedule::{EventFilter, ScheduleStore, StoreError};
use crate::user::{
    AuthToken, AuthTokenValue, UserAuthCredentialsStore, UserAuthTokenStore, UserStore,
};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Deserialize, Debug)]
struct NoteBody {
    pub note: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AddAssignmentBody {
    pub user_id: Option<i64>,
    pub role: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UpdateAssignmentBody {
    pub role: Option<String>,
}

#[derive(Deserialize, Debug)]
struct EventListQuery {
    pub room_id: Option<i64>,
    #[serde(default)]
    pub include_cancelled: bool,
}

#[derive(Serialize)]
struct SyncResponse {
    message: String,
    synced: usize,
    updated: usize,
    total: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

fn store_error_response(err: StoreError) -> Response {
    let status = match &err {
        StoreError::EventNotFound
        | StoreError::NoteNotFound
        | StoreError::AssignmentNotFound
        | StoreError::UserNotFound => StatusCode::NOT_FOUND,
        StoreError::AlreadyAssigned => StatusCode::CONFLICT,
        StoreError::NotNoteAuthor => StatusCode::FORBIDDEN,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Store error: {}", err);
        return error_response(status, "Internal error");
    }
    error_response(status, err.to_string())
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn login(
    State(user_store): State<SharedUserStore>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("login() called for {}", body.username);
    let credentials = match user_store.get_password_credentials(&body.username) {
        Ok(Some(credentials)) => credentials,
        Ok(None) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Error loading credentials: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match credentials
        .hasher
        .verify(body.password.as_str(), credentials.hash.as_str())
    {
        Ok(true) => {}
        Ok(false) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Error verifying password: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let auth_token = AuthToken {
        user_id: credentials.user_id,
        value: AuthTokenValue::generate(),
        created_at: Utc::now(),
        last_used: None,
    };
    if let Err(err) = user_store.add_auth_token(&auth_token) {
        error!("Error with auth token generation: {}", err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let response_body = LoginSuccessResponse {
        token: auth_token.value.0.clone(),
    };
    let response_body = serde_json::to_string(&response_body).unwrap();

    let cookie_value = HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly",
        COOKIE_SESSION_TOKEN_KEY, auth_token.value.0
    ))
    .unwrap();
    response::Builder::new()
        .status(StatusCode::CREATED)
        .header(header::SET_COOKIE, cookie_value)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(response_body))
        .unwrap()
}

async fn logout(State(user_store): State<SharedUserStore>, session: Session) -> Response {
    match user_store.delete_auth_token(&AuthTokenValue(session.token)) {
        Ok(_) => {
            // Expire the cookie by value
            let cookie_value =
                HeaderValue::from_static("session_token=; Path=/; HttpOnly; Max-Age=0");
            response::Builder::new()
                .status(StatusCode::OK)
                .header(header::SET_COOKIE, cookie_value)
                .body(Body::empty())
                .unwrap()
        }
        Err(err) => {
            error!("Error deleting auth token: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn me(session: Session, State(user_store): State<SharedUserStore>) -> Response {
    match user_store.get_user(session.user_id) {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Error loading user {}: {}", session.user_id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_events(
    _session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Query(query): Query<EventListQuery>,
) -> Response {
    let filter = EventFilter {
        room_id: query.room_id,
        include_cancelled: query.include_cancelled,
    };
    match schedule_store.list_events(filter) {
        Ok(events) => Json(events).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_event(
    _session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path(id): Path<i64>,
) -> Response {
    match schedule_store.get_event(id) {
        Ok(event) => Json(event).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn add_note(
    session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path(event_id): Path<i64>,
    Json(body): Json<NoteBody>,
) -> Response {
    let Some(text) = body.note.as_deref().filter(|text| !text.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Note text is required");
    };
    match schedule_store.add_note(event_id, session.user_id, text) {
        Ok(note) => (StatusCode::CREATED, Json(note)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn update_note(
    session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path((event_id, note_id)): Path<(i64, i64)>,
    Json(body): Json<NoteBody>,
) -> Response {
    match schedule_store.update_note(event_id, note_id, session.user_id, body.note.as_deref()) {
        Ok(note) => Json(note).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn delete_note(
    session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path((event_id, note_id)): Path<(i64, i64)>,
) -> Response {
    match schedule_store.delete_note(event_id, note_id, session.user_id) {
        Ok(()) => Json(serde_json::json!({ "message": "Note deleted successfully" })).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn add_assignment(
    _session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path(event_id): Path<i64>,
    Json(body): Json<AddAssignmentBody>,
) -> Response {
    let Some(user_id) = body.user_id else {
        return error_response(StatusCode::BAD_REQUEST, "User ID is required");
    };
    match schedule_store.add_assignment(event_id, user_id, body.role.as_deref().unwrap_or("")) {
        Ok(assignment) => (StatusCode::CREATED, Json(assignment)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn update_assignment(
    _session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path((event_id, assignment_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateAssignmentBody>,
) -> Response {
    match schedule_store.update_assignment(event_id, assignment_id, body.role.as_deref()) {
        Ok(assignment) => Json(assignment).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn delete_assignment(
    _session: Session,
    State(schedule_store): State<SharedScheduleStore>,
    Path((event_id, assignment_id)): Path<(i64, i64)>,
) -> Response {
    match schedule_store.delete_assignment(event_id, assignment_id) {
        Ok(()) => {
            Json(serde_json::json!({ "message": "Assignment removed successfully" })).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

async fn sync_events(_session: Session, State(state): State<ServerState>) -> Response {
    // Default to the next 30 days
    let start_date = Utc::now().date_naive();
    let end_date = start_date + chrono::Days::new(30);

    let records = match state.event_source.fetch_events(start_date, end_date).await {
        Ok(records) => records,
        Err(err) => {
            error!("Failed to fetch events from Ministry Platform: {}", err);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch events from Ministry Platform: {}", err),
            );
        }
    };

    match crate::sync::sync_events(state.schedule_store.as_ref(), &records, &state.tracked_rooms) {
        Ok(counts) => Json(SyncResponse {
            message: "Events synced successfully".to_string(),
            synced: counts.created,
            updated: counts.updated,
            total: counts.created + counts.updated,
        })
        .into_response(),
        Err(err) => {
            error!("Sync failed: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Sync failed: {}", err),
            )
        }
    }
}

async fn get_tracked_rooms(_session: Session, State(state): State<ServerState>) -> Response {
    Json(state.tracked_rooms.as_ref().clone()).into_response()
}

async fn list_users(_session: Session, State(user_store): State<SharedUserStore>) -> Response {
    match user_store.list_users() {
        Ok(users) => Json(users).into_response(),
        Err(err) => {
            error!("Error listing users: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_user(
    _session: Session,
    State(user_store): State<SharedUserStore>,
    Path(id): Path<i64>,
) -> Response {
    match user_store.get_user(id) {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Error loading user {}: {}", id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    user_store: SharedUserStore,
    schedule_store: SharedScheduleStore,
    event_source: Arc<MinistryPlatformClient>,
    tracked_rooms: BTreeMap<i64, String>,
) -> Result<Router> {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        user_store,
        schedule_store,
        event_source,
        tracked_rooms: Arc::new(tracked_rooms),
    };

    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .with_state(state.clone());

    let event_routes: Router = Router::new()
        .route("/", get(get_events))
        .route("/{id}", get(get_event))
        .route("/{id}/notes", post(add_note))
        .route("/{id}/notes/{note_id}", put(update_note))
        .route("/{id}/notes/{note_id}", delete(delete_note))
        .route("/{id}/assignments", post(add_assignment))
        .route("/{id}/assignments/{assignment_id}", put(update_assignment))
        .route(
            "/{id}/assignments/{assignment_id}",
            delete(delete_assignment),
        )
        .with_state(state.clone());

    let user_routes: Router = Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user))
        .with_state(state.clone());

    let sync_routes: Router = Router::new()
        .route("/events", post(sync_events))
        .route("/rooms", get(get_tracked_rooms))
        .with_state(state.clone());

    let app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1/auth", auth_routes)
        .nest("/v1/events", event_routes)
        .nest("/v1/users", user_routes)
        .nest("/v1/sync", sync_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    user_store: SharedUserStore,
    schedule_store: SharedScheduleStore,
    event_source: MinistryPlatformClient,
    tracked_rooms: BTreeMap<i64, String>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
    };
    let app = make_app(
        config,
        user_store,
        schedule_store,
        Arc::new(event_source),
        tracked_rooms,
    )?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
