pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod integrations;
pub mod scheduler;
pub mod snapshot;
pub mod state;

use axum::Router;
use axum::routing::get;

use state::AgentState;

/// Build the Axum router over an already-constructed agent state.
pub fn build_app(state: AgentState) -> Router<()> {
    Router::new()
        .route("/metrics", get(api::get_metrics))
        .route("/integrations", get(api::list_integrations))
        .route(
            "/integrations/{name}/metrics",
            get(api::get_integration_metrics),
        )
        .route("/-/healthy", get(health::health_check))
        .route("/-/ready", get(health::readiness_check))
        .with_state(state)
}
