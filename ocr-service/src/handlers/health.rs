use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Health check endpoint for Docker/K8s liveness probes.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "ocr-service",
            "version": env!("CARGO_PKG_VERSION"),
            "pdf_services_configured": state.config.pdf_services.is_configured(),
        })),
    )
}

/// Readiness check; reports unavailable once shutdown has begun.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if state.shutdown.is_cancelled() {
        return Err(AppError::ServiceUnavailable);
    }
    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
