//! Health check handler

use axum::{extract::State, response::Json};

use crate::runtime::{AppState, types::HealthResponse};

/// GET /health - Liveness check with version info
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "dumpvault".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        driver: state.service.config().database.driver.as_str().to_string(),
        operation_in_progress: state.service.guard().is_busy(),
    })
}
