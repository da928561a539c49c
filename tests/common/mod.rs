//! In-process mock of the ConectaTech REST API, bound to an ephemeral localhost port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use conectatech::config::ClientConfig;

pub const PASSWORD: &str = "secret1";

#[derive(Default)]
pub struct MockState {
    /// email -> (password, user json)
    pub users: HashMap<String, (String, Value)>,
    /// token -> email
    pub tokens: HashMap<String, String>,
    pub contacts: Vec<Value>,
    pub resources: Vec<Value>,
    /// Authorization header of every data request, in arrival order.
    pub seen_auth: Vec<Option<String>>,
    /// Answer 401 to data requests regardless of the token.
    pub force_401: bool,
    next_id: i64,
}

impl MockState {
    fn seeded() -> Self {
        let mut s = MockState { next_id: 10, ..Default::default() };
        s.add_user(1, "maestro@conectatech.cl", "maestro");
        s.add_user(2, "super@conectatech.cl", "supervisor");
        s.add_user(3, "normal@conectatech.cl", "normal");
        s.add_user(4, "raro@conectatech.cl", "admin");
        s.contacts.push(json!({
            "id": 1, "full_name": "Juan Soto", "boss_name": "María", "position": "Técnico",
            "vehicle": {"id": 1, "plate": "ABC-123", "type": "Camioneta"},
            "contact_numbers": [{"id": 1, "numero": "+56 9 1111 2222"}],
            "created_by_user_id": 1, "created_at": "2024-05-01T12:00:00Z", "updated_at": "2024-05-01T12:00:00Z"
        }));
        s.resources.push(json!({
            "id": 1, "title": "Manual de red", "detail": "Switches y VLAN", "type_resource": "documento",
            "url_resource": "https://ejemplo.com/red.pdf", "created_by_user_email": "maestro@conectatech.cl",
            "created_at": "2024-05-01T12:00:00Z", "updated_at": "2024-05-01T12:00:00Z"
        }));
        s
    }

    pub fn add_user(&mut self, id: i64, email: &str, role: &str) {
        let user = json!({"id": id, "email": email, "role": role, "nombre": "Test", "apellido": "User"});
        self.users.insert(email.to_string(), (PASSWORD.to_string(), user));
    }

    pub fn set_role(&mut self, email: &str, role: Value) {
        if let Some((_, u)) = self.users.get_mut(email) {
            u["role"] = role;
        }
    }

    fn bearer_user(&self, headers: &HeaderMap) -> Option<Value> {
        let token = headers.get("authorization")?.to_str().ok()?.strip_prefix("Bearer ")?;
        let email = self.tokens.get(token)?;
        self.users.get(email).map(|(_, u)| u.clone())
    }
}

type Shared = Arc<Mutex<MockState>>;

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "Token inválido o expirado"})))
}

async fn login(State(s): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut st = s.lock();
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();
    let user = match st.users.get(&email) {
        Some((pw, u)) if pw == password => u.clone(),
        _ => return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Credenciales inválidas"}))),
    };
    // a 200 without a token, for the incomplete-response path
    if email.starts_with("sintoken") {
        return (StatusCode::OK, Json(json!({"user": user})));
    }
    st.next_id += 1;
    let token = format!("tok-{}", st.next_id);
    st.tokens.insert(token.clone(), email);
    (StatusCode::OK, Json(json!({"user": user, "token": token})))
}

async fn register(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut st = s.lock();
    if st.bearer_user(&headers).is_none() {
        return unauthorized();
    }
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if st.users.contains_key(&email) {
        return (StatusCode::CONFLICT, Json(json!({"message": "El correo ya está registrado"})));
    }
    st.next_id += 1;
    let id = st.next_id;
    let role = body["role"].as_str().unwrap_or("normal").to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let user = json!({"id": id, "email": email, "role": role, "nombre": body["nombre"], "apellido": body["apellido"]});
    st.users.insert(email, (password, user.clone()));
    (StatusCode::CREATED, Json(json!({"success": true, "message": "Usuario creado", "user": user})))
}

async fn profile(State(s): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let st = s.lock();
    match st.bearer_user(&headers) {
        Some(u) => (StatusCode::OK, Json(u)),
        None => unauthorized(),
    }
}

fn gate(st: &mut MockState, headers: &HeaderMap) -> Option<(StatusCode, Json<Value>)> {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
    st.seen_auth.push(auth);
    if st.force_401 || st.bearer_user(headers).is_none() {
        return Some(unauthorized());
    }
    None
}

async fn list_contacts(State(s): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let mut st = s.lock();
    if let Some(denied) = gate(&mut st, &headers) {
        return denied;
    }
    (StatusCode::OK, Json(Value::Array(st.contacts.clone())))
}

async fn create_contact(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut st = s.lock();
    if let Some(denied) = gate(&mut st, &headers) {
        return denied;
    }
    st.next_id += 1;
    let id = st.next_id;
    let numbers: Vec<Value> = body["contact_numbers"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, n)| json!({"id": i as i64 + 1, "numero": n}))
        .collect();
    st.contacts.push(json!({
        "id": id, "full_name": body["full_name"], "boss_name": body["boss_name"], "position": body["position"],
        "vehicle": {"id": id, "plate": body["vehicle_plate"], "type": body["vehicle_type"]},
        "contact_numbers": numbers, "created_by_user_id": 1,
        "created_at": "2024-06-01T09:30:00Z", "updated_at": "2024-06-01T09:30:00Z"
    }));
    (StatusCode::CREATED, Json(json!({"message": "Contacto creado", "id": id})))
}

async fn list_resources(State(s): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let mut st = s.lock();
    if let Some(denied) = gate(&mut st, &headers) {
        return denied;
    }
    (StatusCode::OK, Json(Value::Array(st.resources.clone())))
}

async fn create_resource(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut st = s.lock();
    if let Some(denied) = gate(&mut st, &headers) {
        return denied;
    }
    st.next_id += 1;
    let id = st.next_id;
    st.resources.push(json!({
        "id": id, "title": body["title"], "detail": body["detail"], "type_resource": body["type_resource"],
        "url_resource": body["url_resource"], "created_by_user_email": "maestro@conectatech.cl",
        "created_at": "2024-06-01T09:30:00Z", "updated_at": "2024-06-01T09:30:00Z"
    }));
    (StatusCode::CREATED, Json(json!({"message": "Recurso creado", "id": id})))
}

pub struct MockApi {
    pub base_url: String,
    pub state: Shared,
    handle: JoinHandle<()>,
}

impl MockApi {
    /// Client config pointing at this server with in-memory session storage.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_base_url(self.base_url.clone())
    }

    pub fn last_auth(&self) -> Option<String> {
        self.state.lock().seen_auth.last().cloned().flatten()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn() -> MockApi {
    let state: Shared = Arc::new(Mutex::new(MockState::seeded()));
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/profile", get(profile))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/resources", get(list_resources).post(create_resource))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock api error: {e:?}");
        }
    });
    MockApi { base_url: format!("http://{}/api", addr), state, handle }
}
