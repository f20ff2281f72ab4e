//! In-process stand-in for the video API, built on axum.
//!
//! The ingest route reassembles chunks the way the real server does: the
//! first chunk creates the file, later chunks append, and the answer is
//! `201 Created` once the declared size is reached, `206 Partial Content`
//! before that.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use url::Url;

pub const SESSION_COOKIE: &str = "session=test-session";

#[derive(Debug, Clone)]
pub struct RecordedChunk {
    pub file_name: String,
    pub file_size: String,
    pub first_chunk: String,
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body_len: usize,
}

#[derive(Default)]
pub struct IngestState {
    pub files: HashMap<String, Vec<u8>>,
    pub chunks: Vec<RecordedChunk>,
    /// Zero-based request number that answers 500.
    pub fail_on_request: Option<usize>,
    /// Reject requests without the login cookie.
    pub require_session: bool,
    pub videos: Vec<Value>,
    pub patches: Vec<(String, Value)>,
    pub deleted: Vec<String>,
    /// Accounts created through `/register`, email to password.
    pub accounts: HashMap<String, String>,
    pub requests: usize,
}

#[derive(Clone, Default)]
pub struct Ingest {
    pub state: Arc<Mutex<IngestState>>,
}

impl Ingest {
    pub fn with(configure: impl FnOnce(&mut IngestState)) -> Self {
        let ingest = Self::default();
        configure(&mut ingest.state.lock().unwrap());
        ingest
    }

    pub fn chunks(&self) -> Vec<RecordedChunk> {
        self.state.lock().unwrap().chunks.clone()
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(name).cloned()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    /// Serve on an ephemeral local port and return the base URL.
    pub async fn spawn(&self) -> Url {
        let app = router().with_state(self.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }
}

fn router() -> Router<Ingest> {
    Router::new()
        .route("/config", get(config))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/video/", post(ingest_chunk))
        .route("/video", get(list_videos))
        .route(
            "/video/{id}",
            get(get_video).delete(delete_video).patch(update_video),
        )
        .route("/server-events/", get(server_events))
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn has_session(headers: &HeaderMap) -> bool {
    header_text(headers, "cookie").contains(SESSION_COOKIE)
}

/// Count the request and enforce the session requirement.
fn admit(ingest: &Ingest, headers: &HeaderMap) -> Result<(), Response> {
    let mut state = ingest.state.lock().unwrap();
    state.requests += 1;
    if state.require_session && !has_session(headers) {
        return Err((StatusCode::UNAUTHORIZED, "User not logged in.").into_response());
    }
    Ok(())
}

async fn config(State(ingest): State<Ingest>, headers: HeaderMap) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    Json(json!({
        "file_size_limit": "15000000",
        "supported_file_types": [
            {"file_type": "video/mp4", "file_extension": ".mp4"}
        ]
    }))
    .into_response()
}

async fn login(State(ingest): State<Ingest>, Json(body): Json<Value>) -> Response {
    let mut state = ingest.state.lock().unwrap();
    state.requests += 1;
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let expected = match email {
        "user@example.com" => Some("secret"),
        other => state.accounts.get(other).map(String::as_str),
    };
    match expected {
        Some(expected) if expected == password => (
            StatusCode::OK,
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))],
            Json(json!({"message": "logged in"})),
        )
            .into_response(),
        Some(_) => StatusCode::UNAUTHORIZED.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

/// Mirrors the server's validation: the confirmation must match the password.
async fn register(State(ingest): State<Ingest>, Json(body): Json<Value>) -> Response {
    let mut state = ingest.state.lock().unwrap();
    state.requests += 1;
    let field = |name: &str| body[name].as_str().map(str::to_string);
    let (Some(username), Some(email), Some(password), Some(confirm)) = (
        field("username"),
        field("email"),
        field("password"),
        field("confirm_password"),
    ) else {
        return json_error(StatusCode::BAD_REQUEST, "Validation failed");
    };
    if username.len() < 3 || password.len() < 8 || confirm != password {
        return json_error(StatusCode::BAD_REQUEST, "Validation failed");
    }
    if state.accounts.contains_key(&email) {
        return json_error(StatusCode::CONFLICT, "Email already registered");
    }
    state.accounts.insert(email.clone(), password);
    (
        StatusCode::CREATED,
        Json(json!({"id": "u1", "username": username, "email": email})),
    )
        .into_response()
}

async fn logout(State(ingest): State<Ingest>, headers: HeaderMap) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "session=; Path=/; Max-Age=0".to_string())],
        Json(json!({"message": "logged out"})),
    )
        .into_response()
}

async fn ingest_chunk(State(ingest): State<Ingest>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }

    let chunk = RecordedChunk {
        file_name: header_text(&headers, "file-name"),
        file_size: header_text(&headers, "file-size"),
        first_chunk: header_text(&headers, "first-chunk"),
        title: header_text(&headers, "title"),
        description: header_text(&headers, "description"),
        content_type: header_text(&headers, "content-type"),
        content_length: header_text(&headers, "content-length").parse().ok(),
        body_len: body.len(),
    };

    let mut state = ingest.state.lock().unwrap();
    let request_no = state.chunks.len();
    state.chunks.push(chunk.clone());

    if state.fail_on_request == Some(request_no) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing file").into_response();
    }

    let declared: usize = chunk.file_size.parse().unwrap_or(usize::MAX);
    let file = if chunk.first_chunk == "true" {
        state.files.insert(chunk.file_name.clone(), Vec::new());
        state.files.get_mut(&chunk.file_name)
    } else {
        state.files.get_mut(&chunk.file_name)
    };
    let Some(file) = file else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing file").into_response();
    };
    file.extend_from_slice(&body);

    if file.len() == declared {
        (
            StatusCode::CREATED,
            "Video received completely and is now being processed.",
        )
            .into_response()
    } else {
        (StatusCode::PARTIAL_CONTENT, "Receiving chunks of the video.").into_response()
    }
}

async fn list_videos(State(ingest): State<Ingest>, headers: HeaderMap) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    let videos = ingest.state.lock().unwrap().videos.clone();
    Json(Value::Array(videos)).into_response()
}

async fn get_video(
    State(ingest): State<Ingest>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    let state = ingest.state.lock().unwrap();
    match state.videos.iter().find(|v| v["id"] == id.as_str()) {
        Some(video) => Json(video.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "Video not found").into_response(),
    }
}

async fn delete_video(
    State(ingest): State<Ingest>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    ingest.state.lock().unwrap().deleted.push(id);
    StatusCode::NO_CONTENT.into_response()
}

async fn update_video(
    State(ingest): State<Ingest>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    ingest.state.lock().unwrap().patches.push((id, body));
    StatusCode::OK.into_response()
}

async fn server_events(State(ingest): State<Ingest>, headers: HeaderMap) -> Response {
    if let Err(resp) = admit(&ingest, &headers) {
        return resp;
    }
    let body = concat!(
        ": connected\n\n",
        "event: upload_status\n",
        "data: {\"id\":\"v1\",\"status\":1,\"title\":\"Clip\",\"thumbnail\":\"\"}\n\n",
        "event: heartbeat\n",
        "data: ping\n\n",
        "event: upload_status\n",
        "data: {\"id\":\"v1\",\"status\":2,\"title\":\"Clip\",\"thumbnail\":\"t.png\"}\n\n",
    );
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
