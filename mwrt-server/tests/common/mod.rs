//! Shared test helpers: in-process stand-ins for the Cognito token endpoint
//! and the MammalWeb analysis API, bound to ephemeral local ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use mwrt_common::config::{AuthDetails, ServiceConfig};
use mwrt_common::SentinelIds;
use serde_json::{json, Value};

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
/// base64("client-id:client-secret")
pub const EXPECTED_BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

pub const SENTINELS: SentinelIds = SentinelIds {
    unclassified: 9,
    nothing: 10,
    no_agreement: 99,
};

/// Serve a router on 127.0.0.1 with an OS-assigned port
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().expect("Should have local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Mock server failed");
    });
    addr
}

/// An address nothing listens on
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    listener.local_addr().expect("Should have local address")
}

// =============================================================================
// Token endpoint
// =============================================================================

/// How the mock token endpoint answers
#[derive(Debug, Clone, Copy)]
pub enum AuthBehavior {
    /// 200 with `{"access_token": "token-<n>"}`, n counting from 1
    Issue,
    /// Given status with an error body
    Fail(u16),
    /// 200 without an access_token field
    NoAccessToken,
    /// Issue after a delay
    Slow(Duration),
}

pub struct MockAuth {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
    behavior: Arc<Mutex<AuthBehavior>>,
    last_request: Arc<Mutex<Option<(Option<String>, String)>>>,
}

#[derive(Clone)]
struct AuthState {
    hits: Arc<AtomicUsize>,
    behavior: Arc<Mutex<AuthBehavior>>,
    last_request: Arc<Mutex<Option<(Option<String>, String)>>>,
}

impl MockAuth {
    pub async fn start(behavior: AuthBehavior) -> Self {
        let state = AuthState {
            hits: Arc::new(AtomicUsize::new(0)),
            behavior: Arc::new(Mutex::new(behavior)),
            last_request: Arc::new(Mutex::new(None)),
        };
        let router = Router::new()
            .route("/oauth2/token", post(issue_token))
            .with_state(state.clone());
        let addr = spawn_server(router).await;

        Self {
            addr,
            hits: state.hits,
            behavior: state.behavior,
            last_request: state.last_request,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/oauth2/token", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_behavior(&self, behavior: AuthBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Authorization header and body of the most recent exchange
    pub fn last_request(&self) -> Option<(Option<String>, String)> {
        self.last_request.lock().unwrap().clone()
    }
}

async fn issue_token(State(state): State<AuthState>, headers: HeaderMap, body: String) -> Response {
    let n = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *state.last_request.lock().unwrap() = Some((authorization, body));

    let behavior = *state.behavior.lock().unwrap();
    match behavior {
        AuthBehavior::Issue => Json(json!({"access_token": format!("token-{}", n)})).into_response(),
        AuthBehavior::Fail(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(json!({"error": "invalid_client"})),
        )
            .into_response(),
        AuthBehavior::NoAccessToken => Json(json!({"token_type": "Bearer"})).into_response(),
        AuthBehavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({"access_token": format!("token-{}", n)})).into_response()
        }
    }
}

// =============================================================================
// MammalWeb analysis API
// =============================================================================

/// How the mock MammalWeb API answers
#[derive(Debug, Clone)]
pub enum UpstreamBehavior {
    /// 201 for this bearer token, 403 for any other
    AcceptToken(String),
    /// 201 for any token
    AcceptAny,
    /// Always this status, with a body that must never reach callers
    AlwaysStatus(u16),
    /// Sleep before answering 201
    Hang(Duration),
}

/// One request received by the mock MammalWeb API
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub const UPSTREAM_ERROR_DETAIL: &str = "internal upstream stack trace";

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[derive(Clone)]
struct UpstreamState {
    behavior: UpstreamBehavior,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start(behavior: UpstreamBehavior) -> Self {
        let state = UpstreamState {
            behavior,
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        // Fallback records every path so retries to a different URL show up
        let router = Router::new().fallback(receive_analysis).with_state(state.clone());
        let addr = spawn_server(router).await;

        Self {
            addr,
            requests: state.requests,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn receive_analysis(
    State(state): State<UpstreamState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        authorization: authorization.clone(),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match &state.behavior {
        UpstreamBehavior::AcceptToken(token) => {
            if authorization.as_deref() == Some(format!("Bearer {}", token).as_str()) {
                StatusCode::CREATED.into_response()
            } else {
                (StatusCode::FORBIDDEN, Json(json!({"message": "Forbidden"}))).into_response()
            }
        }
        UpstreamBehavior::AcceptAny => StatusCode::CREATED.into_response(),
        UpstreamBehavior::AlwaysStatus(code) => (
            StatusCode::from_u16(*code).unwrap(),
            Json(json!({"message": UPSTREAM_ERROR_DETAIL})),
        )
            .into_response(),
        UpstreamBehavior::Hang(delay) => {
            tokio::time::sleep(*delay).await;
            StatusCode::CREATED.into_response()
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

pub fn test_config(auth_endpoint: String, mammalweb_endpoint: String) -> ServiceConfig {
    ServiceConfig {
        sentinels: SENTINELS,
        mammalweb_endpoint,
        auth: AuthDetails {
            cognito_endpoint: auth_endpoint,
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
        },
        upstream_timeout: Duration::from_secs(2),
    }
}
