//! wellspring-dash library - dashboard aggregation service
//!
//! Polls the backend's read-only dashboard endpoints on a fixed interval,
//! merges the successful results into a typed snapshot, and serves that
//! snapshot over HTTP with an SSE stream of notices.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::Stream;
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub mod client;
pub mod notice;
pub mod ops;
pub mod poller;
pub mod view;

use notice::NoticeBroadcaster;
use poller::{Phase, RefreshController};
use view::DashboardView;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<RefreshController<DashboardView>>,
    pub notices: NoticeBroadcaster,
}

impl AppState {
    pub fn new(controller: Arc<RefreshController<DashboardView>>, notices: NoticeBroadcaster) -> Self {
        Self { controller, notices }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
///
/// Health check endpoint for monitoring.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "wellspring-dash".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Snapshot of the aggregated dashboard plus controller status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub phase: Phase,
    pub failure_streak: u32,
    pub loading: bool,
    pub view: DashboardView,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let controller = &state.controller;
    Json(StatusResponse {
        phase: controller.phase(),
        failure_streak: controller.failure_streak(),
        loading: controller.is_loading(),
        view: controller.snapshot().await,
    })
}

/// GET /events - SSE stream of user-visible notices
pub async fn notice_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    state.notices.handle_sse_connection()
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/events", get(notice_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
