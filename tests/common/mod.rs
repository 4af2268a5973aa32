// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process mock of the hosted backend (auth, tables, storage).
//!
//! Implements just enough of the GoTrue/PostgREST/storage surface for the
//! client to talk to, records every request so tests can assert that an
//! operation did (or did not) reach the network, and supports forced
//! failures on the tasks table.

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const MOCK_JWT_SECRET: &[u8] = b"mock-backend-secret";

/// The OAuth code the mock's token endpoint accepts for the pkce grant.
#[allow(dead_code)]
pub const MOCK_OAUTH_CODE: &str = "mock-oauth-code";

/// Shared mock state, inspectable from tests.
#[derive(Default)]
pub struct BackendState {
    /// email -> (password, user id)
    pub users: Mutex<HashMap<String, (String, String)>>,
    /// currently valid refresh tokens -> user id
    pub refresh_tokens: Mutex<HashMap<String, String>>,
    pub tasks: Mutex<Vec<Value>>,
    pub profiles: Mutex<Vec<Value>>,
    /// "bucket/name" -> object size in bytes
    pub objects: Mutex<HashMap<String, usize>>,
    pub next_task_id: AtomicI64,
    pub next_user_id: AtomicU64,
    pub next_refresh_id: AtomicU64,
    /// Recorded requests as "METHOD path?query"
    pub requests: Mutex<Vec<String>>,
    /// When set, every tasks-table request answers HTTP 500.
    pub fail_tasks: AtomicBool,
}

impl BackendState {
    /// Number of recorded requests whose "METHOD path?query" line contains
    /// `needle`.
    #[allow(dead_code)]
    pub fn request_count(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    /// Register a user directly, bypassing the signup endpoint.
    #[allow(dead_code)]
    pub fn seed_user(&self, email: &str, password: &str) -> String {
        let id = format!("user-{}", self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.users.lock().unwrap().insert(
            email.to_string(),
            (password.to_string(), id.clone()),
        );
        id
    }

    /// Register a refresh token directly (for restore-flow tests).
    #[allow(dead_code)]
    pub fn seed_refresh_token(&self, token: &str, user_id: &str) {
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), user_id.to_string());
    }

    /// Insert a raw tasks row, bypassing the insert endpoint.
    #[allow(dead_code)]
    pub fn seed_task(&self, row: Value) -> i64 {
        let id = self.next_task_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut row = row;
        row["id"] = json!(id);
        self.tasks.lock().unwrap().push(row);
        id
    }
}

/// A running mock backend.
pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

/// Bind the mock backend on a random port and serve it in the background.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(BackendState::default());

    let app = Router::new()
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/recover", post(recover))
        .route("/rest/v1/tasks", any(tasks_table))
        .route("/rest/v1/profiles", any(profiles_table))
        .route("/storage/v1/object/{bucket}/{name}", post(upload_object))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { base_url, state }
}

/// Test config pointing at a mock backend, with an isolated local store and
/// no splash delay.
#[allow(dead_code)]
pub fn test_config(base_url: &str, dir: &tempfile::TempDir) -> taskdeck::config::Config {
    taskdeck::config::Config {
        backend_url: base_url.to_string(),
        anon_key: "test-anon-key".to_string(),
        oauth_redirect_url: "taskdeck://auth-callback".to_string(),
        local_store_path: dir.path().join("state.json"),
        splash_min: std::time::Duration::ZERO,
    }
}

/// Issue a mock HS256 access token for a user, expiring `ttl_secs` from now
/// (negative for an already-expired token).
#[allow(dead_code)]
pub fn issue_access_token(user_id: &str, ttl_secs: i64) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &Claims {
            sub: user_id.to_string(),
            exp: chrono::Utc::now().timestamp() + ttl_secs,
        },
        &jsonwebtoken::EncodingKey::from_secret(MOCK_JWT_SECRET),
    )
    .unwrap()
}

// ─── Request tracking ────────────────────────────────────────────────────

async fn track_requests(
    State(state): State<Arc<BackendState>>,
    req: Request,
    next: Next,
) -> Response {
    let line = format!(
        "{} {}",
        req.method(),
        req.uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string())
    );
    state.requests.lock().unwrap().push(line);
    next.run(req).await
}

// ─── Auth endpoints ──────────────────────────────────────────────────────

fn token_response(state: &BackendState, user_id: &str, email: Option<&str>) -> Value {
    let refresh = format!(
        "refresh-{}",
        state.next_refresh_id.fetch_add(1, Ordering::SeqCst) + 1
    );
    state
        .refresh_tokens
        .lock()
        .unwrap()
        .insert(refresh.clone(), user_id.to_string());

    json!({
        "access_token": issue_access_token(user_id, 3600),
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "user": { "id": user_id, "email": email },
    })
}

async fn signup(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let mut users = state.users.lock().unwrap();
    if users.contains_key(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "msg": "User already registered" })),
        )
            .into_response();
    }

    let id = format!("user-{}", state.next_user_id.fetch_add(1, Ordering::SeqCst) + 1);
    users.insert(email.clone(), (password, id.clone()));

    (StatusCode::OK, Json(json!({ "id": id, "email": email }))).into_response()
}

async fn token(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let grant_type = params.get("grant_type").map(String::as_str).unwrap_or("");

    match grant_type {
        "password" => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();

            let users = state.users.lock().unwrap();
            match users.get(email) {
                Some((stored, id)) if stored == password => {
                    let response = token_response(&state, &id.clone(), Some(email));
                    (StatusCode::OK, Json(response)).into_response()
                }
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error_description": "Invalid login credentials" })),
                )
                    .into_response(),
            }
        }
        "refresh_token" => {
            let refresh = body["refresh_token"].as_str().unwrap_or_default();
            let user_id = state.refresh_tokens.lock().unwrap().remove(refresh);
            match user_id {
                Some(user_id) => {
                    let response = token_response(&state, &user_id, None);
                    (StatusCode::OK, Json(response)).into_response()
                }
                None => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error_description": "Invalid Refresh Token" })),
                )
                    .into_response(),
            }
        }
        "pkce" => {
            let code = body["auth_code"].as_str().unwrap_or_default();
            let verifier = body["code_verifier"].as_str().unwrap_or_default();
            if code == MOCK_OAUTH_CODE && !verifier.is_empty() {
                let response = token_response(&state, "oauth-user-1", Some("oauth@example.com"));
                (StatusCode::OK, Json(response)).into_response()
            } else {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error_description": "Invalid authorization code" })),
                )
                    .into_response()
            }
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_description": format!("unsupported grant_type {other}") })),
        )
            .into_response(),
    }
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn recover(Json(_body): Json<Value>) -> Json<Value> {
    Json(json!({}))
}

// ─── Table endpoints ─────────────────────────────────────────────────────

/// Whether a row matches every `eq` filter in the query.
fn row_matches(row: &Value, params: &HashMap<String, String>) -> bool {
    params.iter().all(|(column, raw)| {
        let Some(expected) = raw.strip_prefix("eq.") else {
            // Not a filter (e.g. the `select` parameter)
            return true;
        };
        match row.get(column) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Bool(b)) => b.to_string() == expected,
            Some(Value::Number(n)) => n.to_string() == expected,
            _ => false,
        }
    })
}

/// Project a row to the requested columns (`select=*` keeps everything).
fn project(row: &Value, select: &str) -> Value {
    if select == "*" || select.is_empty() {
        return row.clone();
    }
    let mut out = serde_json::Map::new();
    for column in select.split(',') {
        if let Some(value) = row.get(column.trim()) {
            out.insert(column.trim().to_string(), value.clone());
        }
    }
    Value::Object(out)
}

fn wants_single_object(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/vnd.pgrst.object+json"))
}

async fn tasks_table(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    req: Request,
) -> Response {
    if state.fail_tasks.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "forced failure" })),
        )
            .into_response();
    }

    table_request(&state.tasks, &state.next_task_id, params, headers, req).await
}

async fn profiles_table(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    req: Request,
) -> Response {
    // Profiles are keyed by a caller-supplied id, so no id counter applies.
    static NO_COUNTER: AtomicI64 = AtomicI64::new(0);
    table_request(&state.profiles, &NO_COUNTER, params, headers, req).await
}

async fn table_request(
    rows: &Mutex<Vec<Value>>,
    next_id: &AtomicI64,
    params: HashMap<String, String>,
    headers: HeaderMap,
    req: Request,
) -> Response {
    let method = req.method().clone();
    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    match method.as_str() {
        "GET" => {
            let select = params.get("select").map(String::as_str).unwrap_or("*");
            let matches: Vec<Value> = rows
                .lock()
                .unwrap()
                .iter()
                .filter(|row| row_matches(row, &params))
                .map(|row| project(row, select))
                .collect();

            if wants_single_object(&headers) {
                return match <[Value; 1]>::try_from(matches) {
                    Ok([row]) => (StatusCode::OK, Json(row)).into_response(),
                    Err(_) => (
                        StatusCode::NOT_ACCEPTABLE,
                        Json(json!({ "message": "JSON object requested, multiple (or no) rows returned" })),
                    )
                        .into_response(),
                };
            }
            (StatusCode::OK, Json(Value::Array(matches))).into_response()
        }
        "POST" => {
            let mut row: Value = serde_json::from_slice(&body).unwrap_or(json!({}));
            let prefer = headers
                .get("prefer")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            let mut rows = rows.lock().unwrap();
            if prefer.contains("resolution=merge-duplicates") {
                // Upsert on the row's own id
                let id = row.get("id").cloned();
                rows.retain(|existing| existing.get("id") != id.as_ref());
            } else if row.get("id").is_none() {
                row["id"] = json!(next_id.fetch_add(1, Ordering::SeqCst) + 1);
            }
            rows.push(row.clone());
            (StatusCode::CREATED, Json(json!([row]))).into_response()
        }
        "PATCH" => {
            let patch: Value = serde_json::from_slice(&body).unwrap_or(json!({}));
            let mut updated = Vec::new();

            let mut rows = rows.lock().unwrap();
            for row in rows.iter_mut().filter(|row| row_matches(row, &params)) {
                if let (Some(row_map), Some(patch_map)) = (row.as_object_mut(), patch.as_object())
                {
                    for (key, value) in patch_map {
                        row_map.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
            (StatusCode::OK, Json(Value::Array(updated))).into_response()
        }
        "DELETE" => {
            let mut rows = rows.lock().unwrap();
            rows.retain(|row| !row_matches(row, &params));
            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

// ─── Storage endpoints ───────────────────────────────────────────────────

async fn upload_object(
    State(state): State<Arc<BackendState>>,
    Path((bucket, name)): Path<(String, String)>,
    body: Bytes,
) -> Json<Value> {
    let key = format!("{bucket}/{name}");
    state.objects.lock().unwrap().insert(key.clone(), body.len());
    Json(json!({ "Key": key }))
}
