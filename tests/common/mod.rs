// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use twelve_weeks::config::Config;
use twelve_weeks::db::{InMemoryTokenStore, TokenStore};
use twelve_weeks::routes::create_router;
use twelve_weeks::services::{
    GoalService, GraphClient, PendingPlans, RefreshUnsupported, TokenCache,
};
use twelve_weeks::time_utils::ManualClock;
use twelve_weeks::AppState;

/// Monday 2025-01-06, 09:00 UTC.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
}

/// Everything a test needs to drive the app.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryTokenStore>,
}

/// Router and state over an arbitrary token store, with a manual clock.
pub fn build_app(
    config: Config,
    store: Arc<dyn TokenStore>,
    clock: Arc<ManualClock>,
) -> (Router, Arc<AppState>) {
    let token_cache = TokenCache::with_parts(store, Arc::new(RefreshUnsupported), clock.clone());
    let graph = GraphClient::new(&config).expect("graph client");

    let state = Arc::new(AppState {
        config,
        token_cache,
        goal_service: GoalService::new(graph),
        pending_plans: PendingPlans::new(),
        clock,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with in-memory token storage and a manual clock.
/// Microsoft endpoints point at `config`, unreachable by default.
pub fn create_test_app_with(config: Config) -> TestApp {
    let clock = Arc::new(ManualClock::new(test_now()));
    let store = Arc::new(InMemoryTokenStore::new());
    let (router, state) = build_app(config, store.clone(), clock.clone());

    TestApp {
        router,
        state,
        clock,
        store,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

/// Session JWT for `session_id` issued at [`test_now`].
pub fn create_test_jwt(session_id: &str, signing_key: &[u8]) -> String {
    twelve_weeks::middleware::auth::create_jwt(session_id, signing_key, test_now()).unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pull the `state` query parameter out of an authorization URL.
pub fn state_param(auth_url: &str) -> String {
    let raw = auth_url
        .split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("auth url has state");
    urlencoding::decode(raw).unwrap().into_owned()
}

// ─── Mock Microsoft endpoints ────────────────────────────────

pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// In-memory stand-in for the identity platform and Graph To Do.
#[derive(Default)]
pub struct MockGraph {
    /// (id, displayName, tasks)
    pub lists: Mutex<Vec<(String, String, Vec<Value>)>>,
    /// When set, every Graph call answers 401
    pub reject_tokens: AtomicBool,
    /// List IDs whose task reads fail with 500
    pub broken_lists: Mutex<Vec<String>>,
}

impl MockGraph {
    pub fn add_list(&self, name: &str, tasks: Vec<Value>) -> String {
        let mut lists = self.lists.lock().unwrap();
        let id = format!("list-{}", lists.len() + 1);
        lists.push((id.clone(), name.to_string(), tasks));
        id
    }

    pub fn reject_tokens(&self) {
        self.reject_tokens.store(true, Ordering::SeqCst);
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.reject_tokens.load(Ordering::SeqCst) {
            return false;
        }
        headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .is_some_and(|h| h == format!("Bearer {}", MOCK_ACCESS_TOKEN))
    }
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": "InvalidAuthenticationToken"}})),
    )
        .into_response()
}

/// Code whose grant claims a lifetime no timestamp can hold.
pub const ENDLESS_GRANT_CODE: &str = "endless-code";

async fn token(body: String) -> axum::response::Response {
    if body.contains(&format!("code={}", ENDLESS_GRANT_CODE)) {
        return Json(json!({
            "token_type": "Bearer",
            "access_token": MOCK_ACCESS_TOKEN,
            "expires_in": i64::MAX
        }))
        .into_response();
    }
    if !body.contains("grant_type=authorization_code") || !body.contains("code=good-code") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response();
    }
    Json(json!({
        "token_type": "Bearer",
        "access_token": MOCK_ACCESS_TOKEN,
        "refresh_token": "mock-refresh-token",
        "expires_in": 3600
    }))
    .into_response()
}

async fn get_lists(
    State(mock): State<Arc<MockGraph>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let lists = mock.lists.lock().unwrap();
    let value: Vec<Value> = lists
        .iter()
        .map(|(id, name, _)| json!({"id": id, "displayName": name}))
        .collect();
    Json(json!({ "value": value })).into_response()
}

async fn create_list(
    State(mock): State<Arc<MockGraph>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let name = body["displayName"].as_str().unwrap_or_default().to_string();
    let id = mock.add_list(&name, vec![]);
    (
        StatusCode::CREATED,
        Json(json!({"id": id, "displayName": name})),
    )
        .into_response()
}

async fn get_tasks(
    State(mock): State<Arc<MockGraph>>,
    headers: HeaderMap,
    Path(list_id): Path<String>,
) -> axum::response::Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    if mock.broken_lists.lock().unwrap().contains(&list_id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let lists = mock.lists.lock().unwrap();
    match lists.iter().find(|(id, _, _)| *id == list_id) {
        Some((_, _, tasks)) => Json(json!({ "value": tasks })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_task(
    State(mock): State<Arc<MockGraph>>,
    headers: HeaderMap,
    Path(list_id): Path<String>,
    Json(mut body): Json<Value>,
) -> axum::response::Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let mut lists = mock.lists.lock().unwrap();
    let Some((_, _, tasks)) = lists.iter_mut().find(|(id, _, _)| *id == list_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    body["id"] = json!(format!("{}-task-{}", list_id, tasks.len() + 1));
    body["status"] = json!("notStarted");
    tasks.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

/// Start the mock on a random local port and return a config pointing at it.
pub async fn spawn_mock_graph(mock: Arc<MockGraph>) -> Config {
    let app = Router::new()
        .route("/consumers/oauth2/v2.0/token", post(token))
        .route("/v1.0/me/todo/lists", get(get_lists).post(create_list))
        .route(
            "/v1.0/me/todo/lists/{list_id}/tasks",
            get(get_tasks).post(create_task),
        )
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = Config::test_default();
    config.login_base_url = format!("http://{}", addr);
    config.graph_base_url = format!("http://{}/v1.0", addr);
    config
}

/// A Graph task payload due at midnight on `date` (YYYY-MM-DD).
pub fn graph_task(title: &str, due: Option<&str>) -> Value {
    match due {
        Some(date) => json!({
            "id": format!("t-{}", title),
            "title": title,
            "status": "notStarted",
            "dueDateTime": {"dateTime": format!("{}T00:00:00.0000000", date), "timeZone": "UTC"}
        }),
        None => json!({"id": format!("t-{}", title), "title": title, "status": "notStarted"}),
    }
}
