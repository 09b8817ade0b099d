use std::net::SocketAddr;

use axum::Router;
use clap::Parser;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;
mod store;
mod upstream;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parley Relay API",
        version = "0.1.0",
        description = "Chat relay that negotiates request shapes with a hosted agent, plus an expense sink for the agent's save tool."
    ),
    paths(
        routes::health::health_check,
        routes::chat::relay_chat,
        routes::records::save_expense,
    ),
    components(schemas(
        HealthResponse,
        parley_core::error::ApiError,
        parley_core::chat::ChatRequest,
        parley_core::chat::ChatReply,
        parley_core::records::SaveExpenseRequest,
        parley_core::records::SaveExpenseResponse,
        parley_core::records::ExpenseRow,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "tool_secret",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub agent_configured: bool,
    pub record_store_configured: bool,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = config::ServerArgs::parse();
    let port = args.port;
    let config = config::AppConfig::from_args(args).expect("Invalid configuration");

    if config.agent.is_none() {
        tracing::warn!("LETTA_API_KEY/LETTA_AGENT_ID not set; /api/chat will answer 500");
    }
    if config.tool_secret.is_none() {
        tracing::warn!("TOOL_SECRET not set; /api/expenses will refuse every caller");
    }
    if config.record_store.is_none() {
        tracing::warn!("SUPABASE_URL/SUPABASE_SERVICE_KEY not set; /api/expenses will answer 500");
    }

    let cors_layer = middleware::cors::build_cors_layer(&config.cors_origins);
    let app_state = state::AppState::new(config).expect("Failed to build HTTP client");

    // Router with per-endpoint rate limiting on relay routes
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::chat::router().layer(middleware::rate_limit::chat_layer()))
        .merge(routes::records::router().layer(middleware::rate_limit::records_layer()))
        .layer(middleware::access_log::AccessLogLayer::new())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::custom(middleware::panic::handle_panic))
                .layer(cors_layer),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Parley relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
