use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::state::AgentState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub integrations: IntegrationInfo,
}

#[derive(Serialize)]
pub struct IntegrationInfo {
    pub configured: usize,
    pub scheduled: usize,
    pub scraped: usize,
}

/// GET /-/healthy
pub async fn health_check(State(state): State<AgentState>) -> Json<HealthResponse> {
    let scraped = state.snapshots.read().await.len();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        integrations: IntegrationInfo {
            configured: state.integrations.len(),
            scheduled: state.scheduled().count(),
            scraped,
        },
    })
}

/// GET /-/ready — ready once every scheduled integration has a snapshot.
pub async fn readiness_check(State(state): State<AgentState>) -> (StatusCode, &'static str) {
    let store = state.snapshots.read().await;
    let pending = state.scheduled().filter(|i| !store.contains(&i.name)).count();
    if pending > 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready: waiting for first scrape",
        );
    }
    (StatusCode::OK, "ready")
}
