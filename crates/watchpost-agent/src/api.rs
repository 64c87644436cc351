use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use watchpost_core::{IntegrationError, encode_text};

use crate::error::AppError;
use crate::scheduler::scrape_once;
use crate::state::AgentState;

/// Prometheus text exposition content type.
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

fn exposition(body: String) -> Response {
    ([(CONTENT_TYPE, TEXT_FORMAT)], body).into_response()
}

/// GET /metrics — latest scheduled snapshot of every integration, followed by
/// the agent's own scrape-health metrics.
pub async fn get_metrics(State(state): State<AgentState>) -> Result<Response, AppError> {
    let store = state.snapshots.read().await;
    let mut body = store.render();
    let health = store
        .health_families()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    body.push_str(&encode_text(&health)?);
    Ok(exposition(body))
}

/// GET /integrations/{name}/metrics — scrape one integration on demand.
pub async fn get_integration_metrics(
    State(state): State<AgentState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let integration = state
        .integrations
        .get(&name)
        .ok_or(IntegrationError::UnknownIntegration(name))?;
    let text = scrape_once(integration).await?;
    Ok(exposition(text))
}

#[derive(Debug, Serialize)]
pub struct IntegrationSummary {
    pub name: String,
    pub instance: String,
    pub scheduled: bool,
    pub scrape_interval_secs: f64,
    pub scrape_timeout_secs: f64,
    /// `None` until the first scheduled scrape has run.
    pub up: Option<bool>,
}

/// GET /integrations — constructed integrations and their last scrape state.
pub async fn list_integrations(State(state): State<AgentState>) -> Json<Vec<IntegrationSummary>> {
    let store = state.snapshots.read().await;
    let summaries = state
        .integrations
        .values()
        .map(|i| IntegrationSummary {
            name: i.name.clone(),
            instance: i.instance.clone(),
            scheduled: i.common.scrape_integration,
            scrape_interval_secs: i.common.scrape_interval.as_secs_f64(),
            scrape_timeout_secs: i.common.scrape_timeout.as_secs_f64(),
            up: store.get(&i.name).map(|s| s.up),
        })
        .collect();
    Json(summaries)
}
