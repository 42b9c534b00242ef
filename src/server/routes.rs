//! HTTP routes.
//!
//! - `GET /` - service banner
//! - `GET /health` - store reachability
//! - `POST /api/log/validation` - record one validation attempt
//! - `GET /api/logs/search` - filtered, paginated search
//! - `GET /api/logs/user-activity` - trailing-window report for one license
//! - `GET /api/stats/license/:license_key` - per-license statistics
//! - `GET /api/stats/summary` - statistics over all or filtered records
//! - `GET /api/debug/db-status` - row counts, registered in debug mode only
//!
//! Everything under `/api`, unmatched paths included, requires the
//! `X-API-Key` header.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{ConnectInfo, DefaultBodyLimit, OriginalUri, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::state::AppState;
use crate::config::LoggerConfig;
use crate::ingest::payload::parse_payload;
use crate::manager::{DbStatus, HealthStatus, IngestReceipt, LogManager, SERVICE_NAME};
use crate::policy::access::API_KEY_HEADER;
use crate::query::filter::{non_blank, QueryParams};
use crate::query::page::SearchPage;
use crate::stats::aggregator::{ActivityReport, LicenseStats, SummaryStats, DEFAULT_ACTIVITY_DAYS};
use crate::stats::snapshot::Granularity;
use crate::LicenseLogError;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the router (separated for testing).
pub fn router(state: AppState) -> Router {
    let mut api = Router::new()
        .route("/log/validation", post(log_validation))
        .route("/logs/search", get(search_logs))
        .route("/logs/user-activity", get(user_activity))
        .route("/stats/license/:license_key", get(license_stats))
        .route("/stats/summary", get(summary_stats));
    if state.debug() {
        api = api.route("/debug/db-status", get(db_status));
    }
    // The key check wraps the fallback too, so unknown /api paths answer 401.
    let api = api
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the store, bind `config.bind_addr()` and serve until Ctrl-C.
pub async fn serve(config: LoggerConfig) -> Result<(), LicenseLogError> {
    let addr = config.bind_addr();
    let manager = LogManager::new(config)?;
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LicenseLogError::Server(format!("cannot bind {}: {}", addr, e)))?;

    serve_with(listener, AppState::new(Arc::new(manager)), shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_with<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), LicenseLogError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener
        .local_addr()
        .map_err(|e| LicenseLogError::Server(e.to_string()))?;
    info!(addr = %local, debug = state.debug(), "license logger listening");

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LicenseLogError::Server(e.to_string()))?;

    info!("license logger stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

// ============================================================================
// Middleware
// ============================================================================

async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, LicenseLogError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state.policy().check(presented) {
        let path = match request.extensions().get::<OriginalUri>() {
            Some(OriginalUri(uri)) => uri.path(),
            None => request.uri().path(),
        };
        warn!(path = %path, "rejected request without valid API key");
        return Err(e);
    }
    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

async fn banner() -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.run(|m| Ok(m.health())).await {
        Ok(report) => {
            let status = match report.status {
                HealthStatus::Healthy => StatusCode::OK,
                HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, Json(report)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "health check did not complete");
            let body = json!({
                "status": HealthStatus::Degraded,
                "service": SERVICE_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "reason": e.to_string(),
                "timestamp": Utc::now(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

async fn log_validation(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<IngestReceipt>), LicenseLogError> {
    let body = body.map_err(|e| {
        LicenseLogError::validation(format!(
            "request body rejected (limit {} bytes): {}",
            MAX_BODY_BYTES,
            e.body_text()
        ))
    })?;
    let payload = parse_payload(&body)?;
    let ip_address = peer.map(|ConnectInfo(addr)| addr.ip().to_string());

    let receipt = state.run(move |m| m.ingest(payload, ip_address)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn search_logs(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<SearchPage>, LicenseLogError> {
    let query = query_params(params)?.search_query()?;
    let page = state.run(move |m| m.search(&query)).await?;
    Ok(Json(page))
}

#[derive(Debug, Default, Deserialize)]
struct ActivityParams {
    license_key: Option<String>,
    days: Option<String>,
    bucket: Option<String>,
}

async fn user_activity(
    State(state): State<AppState>,
    params: Result<Query<ActivityParams>, QueryRejection>,
) -> Result<Json<ActivityReport>, LicenseLogError> {
    let Query(params) = params.map_err(|e| LicenseLogError::validation(e.body_text()))?;

    let license_key = non_blank(&params.license_key)
        .ok_or_else(|| LicenseLogError::validation("license_key is required"))?
        .to_string();
    let days = match non_blank(&params.days) {
        None => DEFAULT_ACTIVITY_DAYS,
        Some(raw) => raw.parse::<u32>().map_err(|_| {
            LicenseLogError::validation(format!("days must be a positive integer (got {:?})", raw))
        })?,
    };
    let granularity = match non_blank(&params.bucket) {
        None => Granularity::default(),
        Some(raw) => raw.parse::<Granularity>()?,
    };

    let report = state
        .run(move |m| m.activity(&license_key, days, granularity))
        .await?;
    Ok(Json(report))
}

async fn license_stats(
    State(state): State<AppState>,
    license_key: Result<Path<String>, PathRejection>,
) -> Result<Json<LicenseStats>, LicenseLogError> {
    let Path(license_key) = license_key.map_err(|e| LicenseLogError::validation(e.body_text()))?;
    let stats = state.run(move |m| m.license_stats(&license_key)).await?;
    Ok(Json(stats))
}

async fn summary_stats(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<SummaryStats>, LicenseLogError> {
    let filter = query_params(params)?.filter()?;
    let summary = state.run(move |m| m.summary(&filter)).await?;
    Ok(Json(summary))
}

async fn db_status(State(state): State<AppState>) -> Result<Json<DbStatus>, LicenseLogError> {
    let status = state.run(|m| m.db_status()).await?;
    Ok(Json(status))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> LicenseLogError {
    LicenseLogError::NotFound(format!("no route for {}", uri.path()))
}

fn query_params(
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<QueryParams, LicenseLogError> {
    params
        .map(|Query(p)| p)
        .map_err(|e| LicenseLogError::validation(e.body_text()))
}
