//! In-memory stand-in for the prayer API, with per-endpoint hit counters and
//! failure injection for tests.
use axum::{
    debug_handler,
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub use axum::http::StatusCode;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    VerifyOtp,
    Login,
    Prayer,
    Testimony,
    Comment,
}

/// How an endpoint answers a request it would otherwise accept.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Ok,
    /// Reply with this status and an error message.
    Status(StatusCode),
    /// 200 with a body that is not JSON.
    Malformed,
    /// 200 with `{"data": {}}`.
    MissingField,
}

#[derive(Default)]
pub struct MockState {
    hits: Mutex<HashMap<Endpoint, u64>>,
    behaviors: Mutex<HashMap<Endpoint, Behavior>>,
    email_failures: Mutex<HashMap<Endpoint, Vec<(String, Behavior)>>>,
    fixed_ids: Mutex<HashMap<Endpoint, String>>,
    otps: Mutex<HashMap<String, String>>,
    tokens: Mutex<HashSet<String>>,
    sequence: AtomicU64,
}

impl MockState {
    pub fn hits(&self, endpoint: Endpoint) -> u64 {
        self.hits
            .lock()
            .unwrap()
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// Behavior for every request to `endpoint`.
    pub fn set_behavior(&self, endpoint: Endpoint, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(endpoint, behavior);
    }

    /// Behavior for requests to `endpoint` whose email/username contains
    /// `pattern`. Only the user-facing endpoints carry an email.
    pub fn fail_email(&self, endpoint: Endpoint, pattern: &str, behavior: Behavior) {
        self.email_failures
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push((pattern.to_string(), behavior));
    }

    /// Every successful create on `endpoint` returns `uuid`.
    pub fn fixed_id(&self, endpoint: Endpoint, uuid: &str) {
        self.fixed_ids
            .lock()
            .unwrap()
            .insert(endpoint, uuid.to_string());
    }

    /// Latest verification code issued to `email`.
    pub fn otp_for(&self, email: &str) -> Option<String> {
        self.otps.lock().unwrap().get(email).cloned()
    }

    pub fn registered(&self) -> usize {
        self.otps.lock().unwrap().len()
    }

    fn hit(&self, endpoint: Endpoint, email: Option<&str>) -> Behavior {
        *self.hits.lock().unwrap().entry(endpoint).or_default() += 1;

        if let Some(email) = email {
            let failures = self.email_failures.lock().unwrap();
            if let Some(behavior) = failures.get(&endpoint).and_then(|patterns| {
                patterns
                    .iter()
                    .find(|(pattern, _)| email.contains(pattern.as_str()))
                    .map(|(_, behavior)| *behavior)
            }) {
                return behavior;
            }
        }

        self.behaviors
            .lock()
            .unwrap()
            .get(&endpoint)
            .copied()
            .unwrap_or_default()
    }

    fn next_id(&self, endpoint: Endpoint, prefix: &str) -> String {
        match self.fixed_ids.lock().unwrap().get(&endpoint) {
            Some(uuid) => uuid.clone(),
            None => format!(
                "{prefix}-{}",
                self.sequence.fetch_add(1, Ordering::Relaxed) + 1
            ),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| self.tokens.lock().unwrap().contains(token))
    }
}

/// A mock bound to an ephemeral local port.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockService {
    pub async fn spawn() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(state.clone());
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("Mock service stopped: {err}");
            }
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }
}

pub async fn run(addr: SocketAddr, state: Arc<MockState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/v1/user", post(register))
        .route("/api/v1/user/verify-otp", post(verify_otp))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/prayer", post(create_prayer))
        .route("/api/v1/testimony", post(create_testimony))
        .route("/api/v1/comment", post(add_comment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct Registration {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct OtpVerification {
    email: String,
    otp: String,
}

#[derive(Deserialize)]
struct Login {
    username: String,
    password: String,
    #[allow(unused)]
    fbmtoken: String,
}

#[derive(Deserialize)]
struct NewPrayer {
    title: String,
    #[allow(unused)]
    description: String,
}

#[derive(Deserialize)]
struct NewTestimony {
    prayer_uuid: String,
    #[allow(unused)]
    testimony: String,
}

#[derive(Deserialize)]
struct NewComment {
    #[allow(unused)]
    description: String,
    prayer_uuid: String,
    testimony_uuid: String,
}

fn respond(behavior: Behavior, ok: impl FnOnce() -> Response) -> Response {
    match behavior {
        Behavior::Ok => ok(),
        Behavior::Status(status) => {
            (status, Json(json!({ "message": "injected failure" }))).into_response()
        }
        Behavior::Malformed => (StatusCode::OK, "<html>gateway hiccup</html>").into_response(),
        Behavior::MissingField => (StatusCode::OK, Json(json!({ "data": {} }))).into_response(),
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthorized" })),
    )
        .into_response()
}

fn created(uuid: String) -> Response {
    (StatusCode::CREATED, Json(json!({ "data": { "uuid": uuid } }))).into_response()
}

#[debug_handler]
async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Registration>) -> Response {
    let behavior = state.hit(Endpoint::Register, Some(&body.email));
    respond(behavior, || {
        if body.email.is_empty() || body.password.is_empty() {
            return bad_request("email and password are required");
        }

        let otp = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        debug!("Issued otp {otp} for {}", body.email);
        state.otps.lock().unwrap().insert(body.email, otp);
        (
            StatusCode::CREATED,
            Json(json!({ "message": "User registered, verification code sent." })),
        )
            .into_response()
    })
}

#[debug_handler]
async fn verify_otp(
    State(state): State<Arc<MockState>>,
    Json(body): Json<OtpVerification>,
) -> Response {
    let behavior = state.hit(Endpoint::VerifyOtp, Some(&body.email));
    respond(behavior, || {
        if state.otp_for(&body.email).as_deref() != Some(body.otp.as_str()) {
            return bad_request("invalid verification code");
        }
        Json(json!({ "message": "verified" })).into_response()
    })
}

#[debug_handler]
async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Login>) -> Response {
    let behavior = state.hit(Endpoint::Login, Some(&body.username));
    respond(behavior, || {
        if body.username.is_empty() || body.password.is_empty() {
            return unauthorized();
        }

        let token = format!(
            "token-{}",
            state.sequence.fetch_add(1, Ordering::Relaxed) + 1
        );
        state.tokens.lock().unwrap().insert(token.clone());
        Json(json!({ "status": "success", "data": { "token": token } })).into_response()
    })
}

#[debug_handler]
async fn create_prayer(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<NewPrayer>,
) -> Response {
    let behavior = state.hit(Endpoint::Prayer, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    respond(behavior, || {
        if body.title.is_empty() {
            return bad_request("title is required");
        }
        created(state.next_id(Endpoint::Prayer, "prayer"))
    })
}

#[debug_handler]
async fn create_testimony(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<NewTestimony>,
) -> Response {
    let behavior = state.hit(Endpoint::Testimony, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    respond(behavior, || {
        if body.prayer_uuid.is_empty() {
            return bad_request("prayer_uuid is required");
        }
        created(state.next_id(Endpoint::Testimony, "testimony"))
    })
}

#[debug_handler]
async fn add_comment(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<NewComment>,
) -> Response {
    let behavior = state.hit(Endpoint::Comment, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    respond(behavior, || {
        if body.prayer_uuid.is_empty() || body.testimony_uuid.is_empty() {
            return bad_request("prayer_uuid and testimony_uuid are required");
        }
        created(state.next_id(Endpoint::Comment, "comment"))
    })
}
