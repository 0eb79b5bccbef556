use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::api_client::ApiClient;
use crate::config::ClientConfig;

pub const TEST_TOKEN: &str = "test-token";

/// Requests seen by the mock API and the deployment phases it will report
#[derive(Default)]
pub struct MockState {
    pub requests: Vec<String>,
    pub bodies: Vec<Value>,
    pub phases: VecDeque<Option<&'static str>>,
    pub live_url: Option<String>,
}

type Shared = Arc<Mutex<MockState>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl TestServer {
    pub async fn new() -> Result<Self> {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route("/v2/apps", get(list_apps).post(create_app))
            .route("/v2/apps/propose", axum::routing::post(propose))
            .route("/v2/apps/regions", get(list_regions))
            .route("/v2/apps/:app_id", get(get_app).delete(delete_app))
            .route("/v2/apps/:app_id/deployments", axum::routing::post(create_deployment))
            .route("/v2/apps/:app_id/deployments/:deployment_id", get(get_deployment))
            .route(
                "/v2/apps/:app_id/deployments/:deployment_id/components/:component/logs",
                get(get_logs),
            )
            .route("/historic/:name", get(historic_log))
            .with_state(Arc::clone(&state));

        // Create server
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let server = axum::Server::bind(&addr).serve(app.into_make_service());

        // Get the actual address the server is bound to
        let addr = server.local_addr();

        // Spawn the server in the background
        tokio::spawn(async move {
            server.await.unwrap();
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(ClientConfig {
            api_url: self.base_url(),
            access_token: Some(TEST_TOKEN.to_string()),
        })
    }

    /// Queue the phases reported by successive deployment fetches; `None`
    /// answers with a null deployment
    pub fn script_phases(&self, phases: &[Option<&'static str>]) {
        self.state.lock().unwrap().phases = phases.iter().copied().collect();
    }

    /// Make log requests answer with a live stream URL instead of archives
    pub fn set_live_url(&self, url: String) {
        self.state.lock().unwrap().live_url = Some(url);
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.state.lock().unwrap().bodies.clone()
    }
}

fn record(state: &Shared, headers: &HeaderMap, line: String) -> Option<Response> {
    state.lock().unwrap().requests.push(line);

    let expected = format!("Bearer {}", TEST_TOKEN);
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
    if auth != Some(expected.as_str()) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"id": "unauthorized", "message": "Unable to authenticate you"})),
            )
                .into_response(),
        );
    }
    None
}

fn app_json(app_id: &str, name: &str) -> Value {
    json!({
        "id": app_id,
        "spec": {"name": name, "features": ["buildpack-stack=ubuntu-22"]},
        "default_ingress": format!("https://{}.example.app", name),
        "active_deployment": {"id": "dep-active", "phase": "ACTIVE"},
        "created_at": "2021-01-27T20:34:12Z"
    })
}

async fn list_apps(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let page = query.get("page").cloned().unwrap_or_default();
    if let Some(denied) = record(&state, &headers, format!("GET /v2/apps?page={}", page)) {
        return denied;
    }

    if page == "1" {
        Json(json!({
            "apps": [app_json("app-1", "first")],
            "links": {"pages": {"next": "/v2/apps?page=2"}}
        }))
        .into_response()
    } else {
        Json(json!({"apps": [app_json("app-2", "second")], "links": {}})).into_response()
    }
}

async fn create_app(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(denied) = record(&state, &headers, "POST /v2/apps".to_string()) {
        return denied;
    }
    let name = body["spec"]["name"].as_str().unwrap_or_default().to_string();
    state.lock().unwrap().bodies.push(body);
    Json(json!({"app": app_json("app-new", &name)})).into_response()
}

async fn get_app(State(state): State<Shared>, headers: HeaderMap, Path(app_id): Path<String>) -> Response {
    if let Some(denied) = record(&state, &headers, format!("GET /v2/apps/{}", app_id)) {
        return denied;
    }
    match app_id.as_str() {
        "missing" => (
            StatusCode::NOT_FOUND,
            Json(json!({"id": "not_found", "message": "app not found"})),
        )
            .into_response(),
        "idle" => Json(json!({"app": {"id": "idle", "spec": {"name": "idle"}}})).into_response(),
        _ => Json(json!({"app": app_json(&app_id, "sample")})).into_response(),
    }
}

async fn delete_app(State(state): State<Shared>, headers: HeaderMap, Path(app_id): Path<String>) -> Response {
    if let Some(denied) = record(&state, &headers, format!("DELETE /v2/apps/{}", app_id)) {
        return denied;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn create_deployment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(app_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = record(&state, &headers, format!("POST /v2/apps/{}/deployments", app_id)) {
        return denied;
    }
    state.lock().unwrap().bodies.push(body);
    Json(json!({"deployment": {"id": "dep-1", "phase": "PENDING_BUILD", "cause": "manual"}}))
        .into_response()
}

async fn get_deployment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((app_id, deployment_id)): Path<(String, String)>,
) -> Response {
    let line = format!("GET /v2/apps/{}/deployments/{}", app_id, deployment_id);
    if let Some(denied) = record(&state, &headers, line) {
        return denied;
    }

    if deployment_id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"id": "not_found", "message": "deployment not found"})),
        )
            .into_response();
    }

    let next = state.lock().unwrap().phases.pop_front();
    match next {
        Some(Some(phase)) => Json(json!({
            "deployment": {
                "id": deployment_id,
                "phase": phase,
                "cause": "manual",
                "spec": {
                    "name": "sample",
                    "region": "ams",
                    "alerts": [{"rule": "DEPLOYMENT_FAILED"}]
                }
            }
        }))
        .into_response(),
        Some(None) => Json(json!({"deployment": null})).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"id": "unavailable", "message": "try again later"})),
        )
            .into_response(),
    }
}

async fn get_logs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((app_id, deployment_id, component)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let line = format!(
        "GET /v2/apps/{}/deployments/{}/components/{}/logs?type={}&follow={}",
        app_id,
        deployment_id,
        component,
        query.get("type").cloned().unwrap_or_default(),
        query.get("follow").cloned().unwrap_or_default()
    );
    if let Some(denied) = record(&state, &headers, line) {
        return denied;
    }

    let live_url = state.lock().unwrap().live_url.clone();
    if let Some(url) = live_url {
        return Json(json!({"live_url": url})).into_response();
    }

    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Json(json!({"historic_urls": [format!("http://{}/historic/{}.log", host, component)]}))
        .into_response()
}

async fn historic_log(Path(name): Path<String>) -> Response {
    format!("{}: listening on :8080\n", name.trim_end_matches(".log")).into_response()
}

async fn propose(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(denied) = record(&state, &headers, "POST /v2/apps/propose".to_string()) {
        return denied;
    }
    let spec = body["spec"].clone();
    state.lock().unwrap().bodies.push(body);
    Json(json!({
        "app_name_available": true,
        "app_is_static": false,
        "existing_static_apps": "0",
        "max_free_static_apps": "3",
        "app_cost": 5.0,
        "spec": spec
    }))
    .into_response()
}

async fn list_regions(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(denied) = record(&state, &headers, "GET /v2/apps/regions".to_string()) {
        return denied;
    }
    Json(json!({
        "regions": [
            {"slug": "ams", "label": "Amsterdam", "continent": "Europe", "data_centers": ["ams3"], "default": false},
            {"slug": "nyc", "label": "New York", "continent": "North America", "data_centers": ["nyc1", "nyc3"], "default": true}
        ]
    }))
    .into_response()
}

/// Serve the given frames to a single websocket client, then close
pub async fn spawn_log_stream(frames: Vec<String>) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    Ok(addr)
}
