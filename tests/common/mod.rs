#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use vet_clinic::api::{ApiClient, CredentialProvider, HttpTransport};
use vet_clinic::notify::NotificationLog;
use vet_clinic::session::{MemoryTokenStore, SessionOptions, SessionStore};

struct Account {
    password: String,
    token: String,
    user: Value,
}

#[derive(Default)]
pub struct MockState {
    accounts: HashMap<String, Account>,
    pets: Vec<Value>,
    next_id: i64,
    /// Wrap every payload in `{ "data": ... }`
    pub envelope: bool,
    /// Reject the next DELETE with this status
    pub fail_next_delete: Option<u16>,
    /// Path and query of every request, in arrival order
    pub seen: Vec<String>,
}

type Shared = Arc<Mutex<MockState>>;

/// Clinic REST API stand-in served in-process on a free port
pub struct MockServer {
    pub base_url: String,
    state: Shared,
}

impl MockServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let state: Shared = Arc::new(Mutex::new(MockState { next_id: 1, ..Default::default() }));

        let api = Router::new()
            .route("/login", post(login))
            .route("/register", post(register))
            .route("/me", get(me))
            .route("/pets", get(list_pets).post(create_pet))
            .route("/pets/:id", put(update_pet).delete(delete_pet))
            .with_state(state.clone());
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock server stopped: {}", e);
            }
        });

        Ok(Self { base_url: format!("http://127.0.0.1:{}/api", port), state })
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().expect("mock state");
        f(&mut state)
    }

    pub fn add_account(&self, id: i64, email: &str, password: &str, role: &str, token: &str) {
        self.with_state(|s| {
            s.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    token: token.to_string(),
                    user: json!({
                        "id": id,
                        "first_name": "Test",
                        "last_name": role,
                        "email": email,
                        "role": role
                    }),
                },
            );
        });
    }

    pub fn insert_pet(&self, pet: Value) -> i64 {
        self.with_state(|s| {
            let id = s.next_id;
            s.next_id += 1;
            let mut pet = pet;
            pet["id"] = json!(id);
            s.pets.push(pet);
            id
        })
    }

    pub fn pet_names(&self) -> Vec<String> {
        self.with_state(|s| {
            s.pets
                .iter()
                .filter_map(|p| p["name"].as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.with_state(|s| s.seen.clone())
    }

    pub fn client(&self) -> Result<ApiClient> {
        let transport = HttpTransport::new(&self.base_url)?;
        Ok(ApiClient::new(Arc::new(transport), CredentialProvider::new()))
    }

    /// Boot and resolve a session against this server
    pub async fn session(&self, tokens: &MemoryTokenStore, log: &NotificationLog) -> Result<SessionStore> {
        let store = SessionStore::boot(
            self.client()?,
            Arc::new(tokens.clone()),
            Arc::new(log.clone()),
            SessionOptions::default(),
        );
        store.resolve().await;
        Ok(store)
    }
}

// --- handlers ----------------------------------------------------------------

fn reply(state: &MockState, status: StatusCode, body: Value) -> Response {
    let body = if state.envelope && status.is_success() {
        json!({ "data": body })
    } else {
        body
    };
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthenticated." }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn authorized(state: &MockState, headers: &HeaderMap) -> Option<Value> {
    let token = bearer(headers)?;
    state.accounts.values().find(|a| a.token == token).map(|a| a.user.clone())
}

fn matches(item: &Value, key: &str, expected: &str) -> bool {
    match &item[key] {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        _ => false,
    }
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let state = state.lock().expect("mock state");
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match state.accounts.get(email) {
        Some(account) if account.password == password => reply(
            &state,
            StatusCode::OK,
            json!({ "token": account.token, "user": account.user }),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" }))).into_response(),
    }
}

async fn register(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().expect("mock state");
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if state.accounts.contains_key(&email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The given data was invalid.",
                "errors": { "email": ["The email has already been taken."] }
            })),
        )
            .into_response();
    }

    let id = 100 + state.accounts.len() as i64;
    let token = format!("token-{}", id);
    let user = json!({
        "id": id,
        "first_name": body["first_name"],
        "last_name": body["last_name"],
        "email": email,
        "role": "client"
    });
    state.accounts.insert(
        email,
        Account {
            password: body["password"].as_str().unwrap_or_default().to_string(),
            token: token.clone(),
            user: user.clone(),
        },
    );
    reply(&state, StatusCode::CREATED, json!({ "token": token, "user": user }))
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().expect("mock state");
    match authorized(&state, &headers) {
        Some(user) => reply(&state, StatusCode::OK, user),
        None => unauthorized(),
    }
}

async fn list_pets(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().expect("mock state");
    let mut seen = "/pets".to_string();
    let mut keys: Vec<_> = query.iter().collect();
    keys.sort();
    for (k, v) in keys {
        seen.push_str(&format!(" {}={}", k, v));
    }
    state.seen.push(seen);

    if authorized(&state, &headers).is_none() {
        return unauthorized();
    }
    let pets: Vec<Value> = state
        .pets
        .iter()
        .filter(|p| query.iter().all(|(k, v)| matches(p, k, v)))
        .cloned()
        .collect();
    reply(&state, StatusCode::OK, Value::Array(pets))
}

async fn create_pet(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().expect("mock state");
    if authorized(&state, &headers).is_none() {
        return unauthorized();
    }
    if body["name"].as_str().map_or(true, str::is_empty) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "The name field is required.", "errors": { "name": ["The name field is required."] } })),
        )
            .into_response();
    }
    let id = state.next_id;
    state.next_id += 1;
    let mut pet = body;
    pet["id"] = json!(id);
    state.pets.push(pet.clone());
    reply(&state, StatusCode::CREATED, pet)
}

async fn update_pet(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().expect("mock state");
    if authorized(&state, &headers).is_none() {
        return unauthorized();
    }
    let Some(pet) = state.pets.iter_mut().find(|p| p["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Pet not found" }))).into_response();
    };
    if let (Some(target), Value::Object(fields)) = (pet.as_object_mut(), body) {
        for (k, v) in fields {
            target.insert(k, v);
        }
    }
    let pet = pet.clone();
    reply(&state, StatusCode::OK, pet)
}

async fn delete_pet(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let mut state = state.lock().expect("mock state");
    if authorized(&state, &headers).is_none() {
        return unauthorized();
    }
    if let Some(status) = state.fail_next_delete.take() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "message": "Delete refused" }))).into_response();
    }
    let before = state.pets.len();
    state.pets.retain(|p| p["id"] != json!(id));
    if state.pets.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Pet not found" }))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}
