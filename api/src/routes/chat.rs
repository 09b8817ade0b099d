use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parley_core::chat::{ChatReply, parse_chat_request};
use parley_core::error::ApiError;
use parley_core::reply::extract_reply;
use parley_core::shapes::SHAPE_CATALOG;

use crate::error::AppError;
use crate::extract::RawBody;
use crate::routes::post_only;
use crate::state::AppState;
use crate::upstream::{AgentClient, describe_exhausted};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/chat", post(relay_chat).fallback(post_only))
        // Path used by clients built against the serverless deployment
        .route(
            "/.netlify/functions/letta-chat",
            post(relay_chat).fallback(post_only),
        )
}

/// Relay one chat turn to the agent
///
/// Validates the body, then tries each request shape in turn against the
/// agent's messages endpoint until one is accepted. The reply text is pulled
/// out of whatever the agent returned; `raw` echoes that body verbatim.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = parley_core::chat::ChatRequest,
    responses(
        (status = 200, description = "Agent replied", body = ChatReply),
        (status = 400, description = "Body is not JSON or misses message/identifier", body = ApiError),
        (status = 405, description = "Not a POST", body = ApiError),
        (status = 500, description = "Agent credentials not configured", body = ApiError),
        (status = 502, description = "Agent rejected every request shape or was unreachable", body = ApiError)
    ),
    tag = "chat"
)]
pub async fn relay_chat(
    State(state): State<AppState>,
    RawBody(body): RawBody,
) -> Result<Json<ChatReply>, AppError> {
    let request = parse_chat_request(&body)?;

    let config = &state.config;
    let credentials = config.agent.as_ref().ok_or(AppError::NotConfigured {
        missing: "LETTA_API_KEY/LETTA_AGENT_ID",
    })?;
    let turn = request.into_turn(config.default_household_id.as_deref());

    let agent = AgentClient::new(
        state.http.clone(),
        &config.agent_base_url,
        credentials,
        &config.user_agent,
    )?;

    let raw = tokio::time::timeout(
        config.negotiation_timeout,
        agent.negotiate(SHAPE_CATALOG, &turn),
    )
    .await
    .map_err(|_| AppError::Upstream {
        message: format!(
            "Upstream agent negotiation timed out after {:?}",
            config.negotiation_timeout
        ),
    })?
    .map_err(|exhausted| AppError::Upstream {
        message: describe_exhausted(&exhausted),
    })?;

    let reply = extract_reply(&raw);
    Ok(Json(ChatReply { reply, raw }))
}
