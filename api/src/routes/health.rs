use axum::extract::State;
use axum::{Json, Router, routing::get};

use crate::HealthResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check endpoint, reports which upstreams are configured
///
/// Never contacts the agent service or the record store; a relay missing its
/// secrets is alive but will answer `500 Server not configured`.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let agent_configured = state.config.agent.is_some();
    let record_store_configured = state.config.record_store.is_some();
    let status = if agent_configured { "ok" } else { "unconfigured" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        agent_configured,
        record_store_configured,
    })
}
