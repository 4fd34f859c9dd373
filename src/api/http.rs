//! HTTP API Server
//!
//! Thin REST layer over the replication core: writes, quorum writes,
//! direct replica reads and repairing reads.

use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::replication::{ReadRepairCoordinator, ReplicaId, ReplicaSet, ReplicationCoordinator};
use crate::error::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Node ID
    pub node_id: String,
    /// Leader and followers
    pub replicas: Arc<ReplicaSet>,
    /// Write path
    pub writer: ReplicationCoordinator,
    /// Repairing read path
    pub repairer: ReadRepairCoordinator,
    /// Process start, for uptime reporting
    pub started: std::time::Instant,
}

impl AppState {
    /// Build state around an opened replica set
    pub fn new(node_id: String, replicas: Arc<ReplicaSet>, writer: ReplicationCoordinator) -> Self {
        Self {
            node_id,
            repairer: ReadRepairCoordinator::new(Arc::clone(&replicas)),
            replicas,
            writer,
            started: std::time::Instant::now(),
        }
    }
}

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Create the router
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            // Write operations
            .route("/write", post(handle_write))
            .route("/write-with-quorum", post(handle_write_with_quorum))
            // Read operations
            .route("/read", get(handle_read))
            .route("/follower-read", get(handle_follower_read))
            .route("/read-with-repair", get(handle_read_with_repair))
            // Status and info
            .route("/status", get(handle_status))
            .route("/health", get(handle_health))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the HTTP server
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("HTTP API disabled");
            return Ok(());
        }

        let app = Self::router(Arc::clone(&self.state));

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.config.bind_address);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

// ============ Request/Response Types ============

/// Write request; a missing key is treated as empty and rejected,
/// a missing value is stored as empty
#[derive(Debug, Deserialize, Serialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Quorum write request; `w` absent or 0 uses the configured quorum
#[derive(Debug, Deserialize, Serialize)]
pub struct QuorumWriteRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub w: Option<usize>,
}

/// Query parameters for reads
#[derive(Debug, Deserialize)]
pub struct ReadParams {
    pub key: Option<String>,
    pub replica: Option<String>,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub node_id: String,
    pub followers: usize,
    pub max_write_quorum: usize,
    pub default_write_quorum: usize,
    pub quorum_timeout_ms: u64,
    pub leader_keys: usize,
    pub wal_path: String,
    pub uptime_seconds: u64,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub node_id: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Core error rendered as an HTTP response
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, reporting rejections in the API error format
fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::InvalidRequest(rejection.body_text()))
}

fn require_key(params: &ReadParams) -> Result<&str> {
    match params.key.as_deref() {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(Error::InvalidKey("missing query parameter: key".into())),
    }
}

// ============ Handlers ============

async fn handle_write(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<WriteRequest>, JsonRejection>,
) -> std::result::Result<StatusCode, ApiError> {
    let req = json_body(payload)?;
    state.writer.write(req.key, req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_write_with_quorum(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<QuorumWriteRequest>, JsonRejection>,
) -> std::result::Result<StatusCode, ApiError> {
    let req = json_body(payload)?;
    // 0 means "not specified", as older clients send it
    let w = req.w.filter(|w| *w != 0);
    state.writer.write_with_quorum(req.key, req.value, w).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_read(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let key = require_key(&params)?;
    let record = state.replicas.read(key, ReplicaId::Leader).await?;
    Ok(Json(record))
}

async fn handle_follower_read(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let key = require_key(&params)?;

    let ordinal = params
        .replica
        .as_deref()
        .and_then(|r| r.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| Error::InvalidReplica(params.replica.clone().unwrap_or_default()))?;

    let record = state.replicas.read(key, ReplicaId::Follower(ordinal)).await?;
    Ok(Json(record))
}

async fn handle_read_with_repair(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadParams>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let key = require_key(&params)?;
    let record = state.repairer.read_with_repair(key).await?;
    Ok(Json(record))
}

async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.writer.config();

    Json(StatusResponse {
        node_id: state.node_id.clone(),
        followers: state.replicas.follower_count(),
        max_write_quorum: state.replicas.replica_count(),
        default_write_quorum: config.default_write_quorum,
        quorum_timeout_ms: config.quorum_timeout.as_millis() as u64,
        leader_keys: state.replicas.leader().store().len().await,
        wal_path: state.replicas.leader().wal_path().await.display().to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        node_id: state.node_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalConfig;
    use crate::replication::{Leader, ReplicationConfig, SimulatedTransport};
    use crate::store::{HybridClock, Record};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    async fn test_app() -> (TempDir, Router, Arc<SimulatedTransport>) {
        let dir = tempdir().unwrap();
        let clock = Arc::new(HybridClock::new());
        let wal = WalConfig {
            file_name: "api.wal".to_string(),
            fsync: false,
        };
        let (leader, _) = Leader::open(dir.path().join("api.wal"), &wal, Arc::clone(&clock))
            .await
            .unwrap();
        let transport = Arc::new(SimulatedTransport::with_delays(
            &[Duration::ZERO, Duration::ZERO],
            clock,
        ));
        let replicas = Arc::new(ReplicaSet::new(leader, transport.clone()));
        let writer = ReplicationCoordinator::new(Arc::clone(&replicas), ReplicationConfig::default());
        let state = Arc::new(AppState::new("kv-test".to_string(), replicas, writer));

        (dir, HttpServer::router(state), transport)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, app, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json("/write", serde_json::json!({"key": "a", "value": "1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get("/read?key=a")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record: Record = body_json(response).await;
        assert_eq!(record.value, "1");
    }

    #[tokio::test]
    async fn test_write_rejects_empty_key() {
        let (_dir, app, _) = test_app().await;

        for body in [serde_json::json!({"key": "", "value": "1"}), serde_json::json!({"value": "1"})] {
            let response = app.clone().oneshot(post_json("/write", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let error: ErrorResponse = body_json(response).await;
            assert_eq!(error.code, "invalid_key");
        }
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_errors() {
        let (_dir, app, _) = test_app().await;

        let cases = [
            ("/write", "not json"),
            ("/write-with-quorum", "not json"),
            ("/write-with-quorum", r#"{"key": "a", "value": "1", "w": "x"}"#),
            ("/write", r#"{"key": 5, "value": "1"}"#),
        ];
        for (uri, body) in cases {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", uri, body);
            let error: ErrorResponse = body_json(response).await;
            assert_eq!(error.code, "invalid_request");
        }

        // No content type at all
        let request = Request::builder()
            .method("POST")
            .uri("/write")
            .body(Body::from(r#"{"key": "a", "value": "1"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_value_is_stored_empty() {
        let (_dir, app, _) = test_app().await;

        for uri in ["/write", "/write-with-quorum"] {
            let response = app
                .clone()
                .oneshot(post_json(uri, serde_json::json!({"key": "a"})))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT, "{}", uri);
        }

        let response = app.oneshot(get("/read?key=a")).await.unwrap();
        let record: Record = body_json(response).await;
        assert_eq!(record.value, "");
    }

    #[tokio::test]
    async fn test_quorum_zero_uses_default() {
        let (_dir, app, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/write-with-quorum",
                serde_json::json!({"key": "z", "value": "1", "w": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get("/read?key=z")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_read_missing_key() {
        let (_dir, app, _) = test_app().await;

        let response = app.clone().oneshot(get("/read?key=nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, "not_found");

        let response = app.oneshot(get("/read")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_follower_read_validates_replica() {
        let (_dir, app, transport) = test_app().await;
        transport.follower(2).unwrap().store().set("a", "f2").await;

        let response = app.clone().oneshot(get("/follower-read?key=a&replica=2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record: Record = body_json(response).await;
        assert_eq!(record.value, "f2");

        for bad in ["0", "3", "x", ""] {
            let uri = format!("/follower-read?key=a&replica={}", bad);
            let response = app.clone().oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "replica={:?}", bad);
        }

        let response = app.oneshot(get("/follower-read?key=a&replica=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_quorum_write_statuses() {
        let (_dir, app, _) = test_app().await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/write-with-quorum",
                serde_json::json!({"key": "b", "value": "2", "w": 3}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(post_json(
                "/write-with-quorum",
                serde_json::json!({"key": "b", "value": "2", "w": 4}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = body_json(response).await;
        assert_eq!(error.code, "invalid_quorum");

        let response = app
            .oneshot(post_json(
                "/write-with-quorum",
                serde_json::json!({"key": "c", "value": "3"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_read_with_repair_endpoint() {
        let (_dir, app, transport) = test_app().await;
        transport.follower(1).unwrap().store().set("a", "only-here").await;

        let response = app.clone().oneshot(get("/read-with-repair?key=a")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record: Record = body_json(response).await;
        assert_eq!(record.value, "only-here");

        let response = app.clone().oneshot(get("/read?key=a")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/read-with-repair?key=ghost")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status() {
        let (_dir, app, _) = test_app().await;

        let response = app.oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let status: serde_json::Value = body_json(response).await;
        assert_eq!(status["node_id"], "kv-test");
        assert_eq!(status["followers"], 2);
        assert_eq!(status["max_write_quorum"], 3);
    }
}
