//! In-process backend for tests

use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;

pub const GOOD_TOKEN: &str = "good-token";
pub const PASSWORD: &str = "secret";
pub const TAKEN_EMAIL: &str = "taken@example.com";
/// Requests for this group's messages never complete
pub const SLOW_GROUP: i64 = 99;

#[derive(Default)]
pub struct MockState {
    /// `Authorization` header of every authenticated route hit
    pub authorizations: Mutex<Vec<Option<String>>>,
    pub ws_attempts: AtomicUsize,
    /// Text frames received over accepted sockets
    pub ws_received: Mutex<Vec<String>>,
    /// Makes `PUT /notifications/:id/read` answer 500
    pub fail_mark_read: AtomicBool,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/v1/auth/login", post(login))
            .route("/api/v1/auth/register", post(register))
            .route("/api/v1/auth/me", get(me))
            .route("/api/v1/groups/", get(groups))
            .route(
                "/api/v1/groups/:id/messages",
                get(list_messages).post(send_message),
            )
            .route("/api/v1/notifications/", get(notifications))
            .route("/api/v1/notifications/:id/read", axum::routing::put(mark_read))
            .route("/api/v1/invitations/:id/accept", post(accept_invitation))
            .route("/ws", get(realtime))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.base_url = format!("http://{}", self.addr);
        config.realtime.ws_url = format!("ws://{}", self.addr);
        config.realtime.reconnect_interval_ms = 10;
        config
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state
            .authorizations
            .lock()
            .unwrap()
            .last()
            .cloned()
            .flatten()
    }
}

pub fn user_json(email: &str) -> Value {
    json!({
        "id": 1, "email": email, "username": "ada", "full_name": "Ada Lovelace",
        "credits": 10.0, "is_active": true, "is_verified": true,
        "created_at": "2024-01-01T00:00:00"
    })
}

pub fn message_json(id: i64, group_id: i64) -> Value {
    json!({
        "id": id, "content": format!("message {}", id), "user_id": 2,
        "group_id": group_id, "is_ai_message": false,
        "created_at": format!("2024-03-01T10:{:02}:00", id % 60)
    })
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ok = auth.as_deref() == Some(&format!("Bearer {}", GOOD_TOKEN)[..]);
    state.authorizations.lock().unwrap().push(auth);
    ok
}

fn rejected() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        let email = body["email"].as_str().unwrap_or_default();
        Json(json!({
            "access_token": GOOD_TOKEN,
            "token_type": "bearer",
            "user": user_json(email),
        }))
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect email or password"})),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email == TAKEN_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    Json(user_json(email)).into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    Json(user_json("ada@example.com")).into_response()
}

async fn groups(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    Json(json!([{
        "id": 7, "name": "Rustaceans", "is_private": false, "ai_enabled": true,
        "ai_model": "gemini", "member_count": 3, "created_by": 1,
        "created_at": "2024-01-01T00:00:00"
    }]))
    .into_response()
}

/// Page 1 holds ids 21..=40; page 2 holds 5..=21, overlapping by one
async fn list_messages(
    State(state): State<Arc<MockState>>,
    Path(group_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    if group_id == SLOW_GROUP {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let ids: Vec<i64> = if page == 1 {
        (21..=40).rev().collect()
    } else {
        (5..=21).collect()
    };
    let messages: Vec<Value> = ids.into_iter().map(|id| message_json(id, group_id)).collect();
    Json(Value::Array(messages)).into_response()
}

async fn send_message(
    State(state): State<Arc<MockState>>,
    Path(group_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    Json(json!({
        "id": 100, "content": body["content"], "user_id": 1, "group_id": group_id,
        "is_ai_message": false, "created_at": "2024-03-01T11:00:00"
    }))
    .into_response()
}

async fn notifications(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    Json(json!({
        "notifications": [
            {
                "id": 1, "type": "group_invitation", "title": "Group invitation",
                "message": "Ada invited you to Book Club", "is_read": false,
                "data": {"invitation_id": 42, "group_name": "Book Club"},
                "created_at": "2024-03-01T10:00:00"
            },
            {
                "id": 2, "type": "system", "title": "Welcome", "message": "Hello",
                "is_read": true, "created_at": "2024-03-01T09:00:00"
            }
        ],
        "unread_count": 1,
        "total_count": 2
    }))
    .into_response()
}

async fn mark_read(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    if state.fail_mark_read.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "Database unavailable"})))
            .into_response();
    }
    Json(json!({"message": "Notification marked as read"})).into_response()
}

async fn accept_invitation(
    State(state): State<Arc<MockState>>,
    Path(invitation_id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        return rejected();
    }
    if invitation_id != 42 {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Invitation not found"})))
            .into_response();
    }
    Json(json!({"message": "Invitation accepted", "group_name": "Book Club", "group_id": 8}))
        .into_response()
}

/// Accepts only the good token. Greets with one `new_message` frame, then
/// records whatever the client sends.
async fn realtime(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    state.ws_attempts.fetch_add(1, Ordering::SeqCst);
    if query.get("token").map(String::as_str) != Some(GOOD_TOKEN) {
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |mut socket| async move {
        let greeting = json!({"type": "new_message", "message": message_json(50, 7)});
        if socket.send(WsMessage::Text(greeting.to_string())).await.is_err() {
            return;
        }
        while let Some(Ok(message)) = socket.recv().await {
            match message {
                WsMessage::Text(text) => state.ws_received.lock().unwrap().push(text),
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
    })
}
