use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// In-process stand-in for the GitHub REST API.
pub struct FakeGitHub {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<SeenRequest>>>,
    down: Arc<AtomicBool>,
    _server: tokio::task::JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct FakeState {
    base: String,
    requests: Arc<Mutex<Vec<SeenRequest>>>,
    down: Arc<AtomicBool>,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let down = Arc::new(AtomicBool::new(false));
        let state = FakeState {
            base: format!("http://{addr}"),
            requests: Arc::clone(&requests),
            down: Arc::clone(&down),
        };

        let app = Router::new()
            .route("/rate_limit", axum::routing::get(rate_limit))
            .route("/repos/{owner}/{repo}", axum::routing::get(repository))
            .route("/repos/{owner}/{repo}/pulls", axum::routing::get(pulls))
            .route("/repos/{owner}/{repo}/releases", axum::routing::get(releases))
            .route("/orgs/{org}/repos", axum::routing::get(org_repos))
            .route("/users/{user}/repos", axum::routing::get(user_repos))
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            requests,
            down,
            _server: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// While down, every endpoint answers 503 without rate-limit headers.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

/// Record the request; returns the outage response while the API is down.
fn record(state: &FakeState, path: String, headers: &HeaderMap) -> Option<Response> {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(SeenRequest {
        path,
        authorization,
    });
    state.down.load(Ordering::SeqCst).then(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Service Unavailable" })),
        )
            .into_response()
    })
}

fn with_rate_headers(body: Value) -> Response {
    let mut resp = Json(body).into_response();
    let headers = resp.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4990"));
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("1767225600"));
    resp
}

pub fn repo_json(base: &str, owner: &str, name: &str, open_issues: u64) -> Value {
    json!({
        "name": name,
        "full_name": format!("{owner}/{name}"),
        "owner": { "login": owner },
        "url": format!("{base}/repos/{owner}/{name}"),
        "private": false,
        "fork": false,
        "archived": false,
        "license": { "key": "mit" },
        "language": "Rust",
        "stargazers_count": 100,
        "forks_count": 12,
        "open_issues_count": open_issues,
        "watchers_count": 100,
        "size": 2048
    })
}

async fn rate_limit(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    if let Some(outage) = record(&state, "/rate_limit".to_string(), &headers) {
        return outage;
    }
    // Body and headers disagree so tests can tell which one was used.
    with_rate_headers(json!({
        "resources": {},
        "rate": { "limit": 60, "remaining": 59, "reset": 1767225600 }
    }))
}

async fn repository(
    State(state): State<FakeState>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(outage) = record(&state, format!("/repos/{owner}/{repo}"), &headers) {
        return outage;
    }
    if repo == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response();
    }
    with_rate_headers(repo_json(&state.base, &owner, &repo, 5))
}

async fn pulls(
    State(state): State<FakeState>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(outage) = record(&state, format!("/repos/{owner}/{repo}/pulls"), &headers) {
        return outage;
    }
    with_rate_headers(json!([{ "number": 1 }, { "number": 2 }]))
}

async fn releases(
    State(state): State<FakeState>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(outage) = record(&state, format!("/repos/{owner}/{repo}/releases"), &headers) {
        return outage;
    }
    with_rate_headers(json!([{
        "name": "",
        "tag_name": "v0.3.0",
        "assets": [{
            "name": format!("{repo}-x86_64.tar.gz"),
            "created_at": "2026-01-01T00:00:00Z",
            "download_count": 77
        }]
    }]))
}

async fn org_repos(
    State(state): State<FakeState>,
    Path(org): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let page = query.get("page").map(String::as_str).unwrap_or("1");
    if let Some(outage) = record(&state, format!("/orgs/{org}/repos?page={page}"), &headers) {
        return outage;
    }
    if page == "2" {
        return with_rate_headers(json!([repo_json(&state.base, &org, "beta", 0)]));
    }
    let mut resp = with_rate_headers(json!([repo_json(&state.base, &org, "alpha", 0)]));
    let link = format!(
        "<{}/orgs/{org}/repos?per_page=100&page=2>; rel=\"next\", <{}/orgs/{org}/repos?per_page=100&page=2>; rel=\"last\"",
        state.base, state.base
    );
    resp.headers_mut()
        .insert("link", HeaderValue::from_str(&link).unwrap());
    resp
}

async fn user_repos(
    State(state): State<FakeState>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Some(outage) = record(&state, format!("/users/{user}/repos"), &headers) {
        return outage;
    }
    with_rate_headers(json!([repo_json(&state.base, &user, "dotfiles", 0)]))
}
