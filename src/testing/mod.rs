use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use crate::api::{ApiClient, ApiRequest, CredentialProvider, Method, Transport};
use crate::error::ApiError;
use crate::models::EntityId;

type ListHook = Box<dyn FnOnce(&mut Vec<Value>) + Send>;

/// In-memory stand-in for the clinic REST backend
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

struct FakeState {
    collections: Mutex<HashMap<String, Vec<Value>>>,
    accounts: Mutex<Vec<Account>>,
    next_id: AtomicI64,
    failures: Mutex<Vec<(String, String, ApiError)>>,
    list_hooks: Mutex<Vec<ListHook>>,
    requests: Mutex<Vec<ApiRequest>>,
    hold: Mutex<Option<String>>,
    held: Notify,
    gate: Semaphore,
    envelope: AtomicBool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            collections: Mutex::default(),
            accounts: Mutex::default(),
            next_id: AtomicI64::new(0),
            failures: Mutex::default(),
            list_hooks: Mutex::default(),
            requests: Mutex::default(),
            hold: Mutex::default(),
            held: Notify::new(),
            gate: Semaphore::new(0),
            envelope: AtomicBool::new(false),
        }
    }
}

struct Account {
    password: String,
    token: String,
    user: Value,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client with a fresh credential slot
    pub fn client(&self) -> ApiClient {
        self.client_with(CredentialProvider::new())
    }

    pub fn client_with(&self, credentials: CredentialProvider) -> ApiClient {
        ApiClient::new(Arc::new(self.clone()), credentials)
    }

    /// Wrap list responses as `{ "data": [...] }` instead of a bare array
    pub fn use_envelope(&self, on: bool) {
        self.state.envelope.store(on, Ordering::SeqCst);
    }

    pub fn insert(&self, collection: &str, mut record: Value) -> EntityId {
        let id = self.next_id();
        record["id"] = json!(id);
        lock(&self.state.collections)
            .entry(collection.to_string())
            .or_default()
            .push(record);
        id
    }

    pub fn add_account(&self, email: &str, password: &str, role: &str, token: &str) -> EntityId {
        let id = self.next_id();
        lock(&self.state.accounts).push(Account {
            password: password.to_string(),
            token: token.to_string(),
            user: json!({ "id": id, "name": email, "email": email, "role": role }),
        });
        id
    }

    /// Fail the next request with this method against this collection (or auth path)
    pub fn fail_next(&self, method: &str, collection: &str, err: ApiError) {
        lock(&self.state.failures).push((method.to_string(), collection.to_string(), err));
    }

    /// Mutate stored records just before the next list is served
    pub fn on_next_list(&self, hook: impl FnOnce(&mut Vec<Value>) + Send + 'static) {
        lock(&self.state.list_hooks).push(Box::new(hook));
    }

    /// Park the next request with this method until `release`
    pub fn hold(&self, method: &str) {
        *lock(&self.state.hold) = Some(method.to_string());
    }

    pub async fn wait_held(&self) {
        self.state.held.notified().await;
    }

    pub fn release(&self) {
        self.state.gate.add_permits(1);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.state.requests).clone()
    }

    fn next_id(&self) -> EntityId {
        self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_failure(&self, method: &str, target: &str) -> Option<ApiError> {
        let mut failures = lock(&self.state.failures);
        let index = failures.iter().position(|(m, c, _)| m == method && c == target)?;
        Some(failures.remove(index).2)
    }

    fn route(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, segments.as_slice()) {
            (Method::Post, ["login"]) => self.login(&body),
            (Method::Post, ["register"]) => self.register(&body),
            (Method::Get, ["me"]) => self.me(request.authorization.as_deref()),
            (Method::Get, [collection]) => Ok(self.list(collection, &request.query)),
            (Method::Post, [collection]) => Ok(self.insert_returning(collection, body)),
            (Method::Put, [collection, id]) => self.update(collection, parse_id(id)?, body),
            (Method::Delete, [collection, id]) => self.remove(collection, parse_id(id)?),
            _ => Err(ApiError::not_found(format!("No route for {} {}", request.method, request.path))),
        }
    }

    fn login(&self, body: &Value) -> Result<Value, ApiError> {
        let email = body["email"].as_str().unwrap_or_default();
        let password = body["password"].as_str().unwrap_or_default();
        let accounts = lock(&self.state.accounts);
        accounts
            .iter()
            .find(|a| a.user["email"] == email && a.password == password)
            .map(|a| json!({ "token": a.token, "user": a.user }))
            .ok_or_else(|| ApiError::auth("Invalid credentials"))
    }

    fn register(&self, body: &Value) -> Result<Value, ApiError> {
        let email = body["email"].as_str().unwrap_or_default().to_string();
        if email.is_empty() {
            let mut fields = HashMap::new();
            fields.insert("email".to_string(), "The email field is required.".to_string());
            return Err(ApiError::validation("The given data was invalid.", Some(fields)));
        }
        if lock(&self.state.accounts).iter().any(|a| a.user["email"] == email.as_str()) {
            let mut fields = HashMap::new();
            fields.insert("email".to_string(), "The email has already been taken.".to_string());
            return Err(ApiError::validation("The given data was invalid.", Some(fields)));
        }
        let id = self.next_id();
        let user = json!({
            "id": id,
            "first_name": body["first_name"],
            "last_name": body["last_name"],
            "email": email,
            "role": body.get("role").cloned().unwrap_or(json!("client")),
        });
        let token = format!("token-{}", id);
        lock(&self.state.accounts).push(Account {
            password: body["password"].as_str().unwrap_or_default().to_string(),
            token: token.clone(),
            user: user.clone(),
        });
        Ok(json!({ "token": token, "user": user }))
    }

    fn me(&self, authorization: Option<&str>) -> Result<Value, ApiError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::auth("Unauthenticated."))?;
        lock(&self.state.accounts)
            .iter()
            .find(|a| a.token == token)
            .map(|a| json!({ "data": a.user }))
            .ok_or_else(|| ApiError::auth("Unauthenticated."))
    }

    fn list(&self, collection: &str, query: &[(String, String)]) -> Value {
        let hooks: Vec<ListHook> = std::mem::take(&mut *lock(&self.state.list_hooks));
        let mut collections = lock(&self.state.collections);
        let records = collections.entry(collection.to_string()).or_default();
        for hook in hooks {
            hook(records);
        }
        let matching: Vec<Value> = records
            .iter()
            .filter(|record| query.iter().all(|(k, v)| field_equals(record, k, v)))
            .cloned()
            .collect();

        if self.state.envelope.load(Ordering::SeqCst) {
            json!({ "data": matching })
        } else {
            Value::Array(matching)
        }
    }

    fn insert_returning(&self, collection: &str, body: Value) -> Value {
        let id = self.insert(collection, body);
        let collections = lock(&self.state.collections);
        collections[collection]
            .iter()
            .find(|r| r["id"] == id)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn update(&self, collection: &str, id: EntityId, body: Value) -> Result<Value, ApiError> {
        let mut collections = lock(&self.state.collections);
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r["id"] == id))
            .ok_or_else(|| ApiError::not_found("Record not found"))?;
        if let (Some(target), Value::Object(fields)) = (record.as_object_mut(), body) {
            merge(target, fields);
        }
        Ok(json!({ "data": record.clone() }))
    }

    fn remove(&self, collection: &str, id: EntityId) -> Result<Value, ApiError> {
        let mut collections = lock(&self.state.collections);
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| ApiError::not_found("Record not found"))?;
        let index = records
            .iter()
            .position(|r| r["id"] == id)
            .ok_or_else(|| ApiError::not_found("Record not found"))?;
        records.remove(index);
        Ok(Value::Null)
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        lock(&self.state.requests).push(request.clone());

        let method = request.method.to_string();
        let should_hold = {
            let mut hold = lock(&self.state.hold);
            if hold.as_deref() == Some(method.as_str()) {
                *hold = None;
                true
            } else {
                false
            }
        };
        if should_hold {
            self.state.held.notify_one();
            if let Ok(permit) = self.state.gate.acquire().await {
                permit.forget();
            }
        }

        let target = request.path.trim_matches('/').split('/').next().unwrap_or_default().to_string();
        if let Some(err) = self.take_failure(&method, &target) {
            return Err(err);
        }
        self.route(&request)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(format!("Invalid id '{}'", raw)))
}

fn field_equals(record: &Value, key: &str, expected: &str) -> bool {
    match record.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

fn merge(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (k, v) in fields {
        if k != "id" {
            target.insert(k, v);
        }
    }
}
