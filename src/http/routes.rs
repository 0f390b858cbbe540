//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/room/new", get(create_room_handler))
        .route("/room/:code", get(join_room_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(assets)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_rooms: usize,
    active_participants: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: state.rooms.active_rooms(),
        active_participants: state.rooms.total_participants(),
    })
}

// ============================================================================
// Room endpoints
// ============================================================================

async fn create_room_handler(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let code = state
        .rooms
        .create_room()
        .map_err(|e| AppError::Unavailable(e.to_string()))?;

    Ok(Redirect::to(&format!("/room/{}", code)))
}

/// Join page: serves the client for a live room, otherwise bounces back to
/// the landing page with an error flag
async fn join_room_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Response {
    if state.rooms.get(&code).is_err() {
        warn!(room = %code, "Join attempt for unknown room");
        return Redirect::to("/?error=invalid_room").into_response();
    }

    info!(room = %code, "Serving room page");
    let page = state.config.static_dir.join("room.html");
    match tokio::fs::read_to_string(&page).await {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            error!(path = %page.display(), error = %e, "Room page missing");
            AppError::Internal("room page unavailable".to_string()).into_response()
        }
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
