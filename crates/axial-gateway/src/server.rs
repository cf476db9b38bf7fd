//! HTTP API over AxialService

use crate::service::AxialService;
use axial_core::{
    ApprovalRequest, CreateGateRequest, Error, ErrorBody, ExportRequest, ForkRequest, RouteRequest,
};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// An axial error rendered as `{error, code, kind}` with the matching status.
#[derive(Debug)]
pub struct ApiError(pub Error);

/// Longest a single `/gates/:id/wait` request may block.
pub const MAX_GATE_WAIT_SECS: u64 = 300;
const DEFAULT_GATE_WAIT_SECS: u64 = 30;

impl From<Error> for ApiError {
    fn from(err: Error) -> Self { Self(err) }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub fn app(service: Arc<AxialService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/plan", post(plan_handler))
        .route("/approve", post(approve_handler))
        .route("/ledger", get(ledger_handler))
        .route("/ledger/verify", get(verify_handler))
        .route("/ledger/export", post(export_handler))
        .route("/ledger/:index", get(ledger_entry_handler))
        .route("/gates", post(create_gate_handler).get(list_gates_handler))
        .route("/gates/:id", get(gate_handler))
        .route("/gates/:id/wait", get(wait_gate_handler))
        .route("/route", post(route_handler))
        .route("/fork", post(fork_handler))
        .route("/forks", get(list_forks_handler))
        .route("/forks/*id", get(get_fork_handler).delete(close_fork_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(service)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
pub async fn serve(
    service: Arc<AxialService>,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Axial daemon v{} listening on http://{}", env!("CARGO_PKG_VERSION"), listener.local_addr()?);
    info!("  Executors: {:?}", service.router().executor_names());
    info!("  Fork backend: {}", service.sessions().backend_name());
    if let Some(path) = service.ledger().path() {
        info!("  Ledger: {}", path.display());
    }

    axum::serve(listener, app(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Axial daemon stopped");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(service): State<Arc<AxialService>>) -> impl IntoResponse {
    Json(service.health().await)
}

/// Any undecodable body is an invalid plan, not a generic bad request.
async fn plan_handler(
    State(service): State<Arc<AxialService>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| Error::invalid_plan(format!("body is not valid JSON: {}", e)))?;
    Ok(Json(service.submit_plan(payload).await?))
}

async fn approve_handler(
    State(service): State<Arc<AxialService>>,
    body: std::result::Result<Json<ApprovalRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    Ok(Json(service.approve(&request)?))
}

#[derive(Debug, Default, Deserialize)]
struct LedgerQuery {
    q: Option<String>,
}

async fn ledger_handler(
    State(service): State<Arc<AxialService>>,
    Query(query): Query<LedgerQuery>,
) -> impl IntoResponse {
    Json(service.ledger_entries(query.q.as_deref()).await)
}

async fn verify_handler(State(service): State<Arc<AxialService>>) -> impl IntoResponse {
    Json(service.verify_ledger().await)
}

async fn export_handler(
    State(service): State<Arc<AxialService>>,
    body: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    Ok(Json(service.export_ledger(&request).await?))
}

async fn ledger_entry_handler(
    State(service): State<Arc<AxialService>>,
    Path(index): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let index: u64 = index
        .parse()
        .map_err(|_| Error::BadRequest(format!("ledger index must be a positive integer, got {:?}", index)))?;
    Ok(Json(service.ledger_entry(index).await?))
}

async fn create_gate_handler(
    State(service): State<Arc<AxialService>>,
    body: std::result::Result<Json<CreateGateRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    Ok((StatusCode::CREATED, Json(service.create_gate(request)?)))
}

#[derive(Debug, Default, Deserialize)]
struct GateQuery {
    #[serde(default)]
    pending: bool,
}

async fn list_gates_handler(
    State(service): State<Arc<AxialService>>,
    Query(query): Query<GateQuery>,
) -> impl IntoResponse {
    Json(service.list_gates(query.pending))
}

async fn gate_handler(
    State(service): State<Arc<AxialService>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.gate(&id)?))
}

#[derive(Debug, Default, Deserialize)]
struct WaitQuery {
    timeout_secs: Option<u64>,
}

async fn wait_gate_handler(
    State(service): State<Arc<AxialService>>,
    Path(id): Path<String>,
    Query(query): Query<WaitQuery>,
) -> ApiResult<impl IntoResponse> {
    let secs = query
        .timeout_secs
        .unwrap_or(DEFAULT_GATE_WAIT_SECS)
        .min(MAX_GATE_WAIT_SECS);
    Ok(Json(service.wait_gate(&id, Duration::from_secs(secs)).await?))
}

/// The route is cancelled if the client goes away before it finishes.
async fn route_handler(
    State(service): State<Arc<AxialService>>,
    body: std::result::Result<Json<RouteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let cancel = CancellationToken::new();
    let _on_disconnect = cancel.clone().drop_guard();
    Ok(Json(service.route(&request, cancel).await?))
}

async fn fork_handler(
    State(service): State<Arc<AxialService>>,
    body: std::result::Result<Json<ForkRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    Ok((StatusCode::CREATED, Json(service.fork(&request.id).await?)))
}

async fn list_forks_handler(State(service): State<Arc<AxialService>>) -> impl IntoResponse {
    Json(service.list_forks())
}

async fn get_fork_handler(
    State(service): State<Arc<AxialService>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.get_fork(&id)?))
}

async fn close_fork_handler(
    State(service): State<Arc<AxialService>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service.close_fork(&id).await?))
}
