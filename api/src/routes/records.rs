use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use parley_core::error::ApiError;
use parley_core::records::{SaveExpenseResponse, parse_expense};

use crate::auth::require_tool_secret;
use crate::error::AppError;
use crate::extract::RawBody;
use crate::routes::post_only;
use crate::state::AppState;
use crate::store::RecordStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/expenses", post(save_expense).fallback(post_only))
        .route(
            "/.netlify/functions/save-expense",
            post(save_expense).fallback(post_only),
        )
}

/// Store an expense on behalf of the agent's save tool
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = parley_core::records::SaveExpenseRequest,
    responses(
        (status = 200, description = "Expense stored", body = SaveExpenseResponse),
        (status = 400, description = "Malformed body, missing fields, bad amount or date", body = ApiError),
        (status = 401, description = "Tool secret missing or wrong", body = ApiError),
        (status = 405, description = "Not a POST", body = ApiError),
        (status = 500, description = "Record store not configured or insert failed", body = ApiError)
    ),
    security(("tool_secret" = [])),
    tag = "records"
)]
pub async fn save_expense(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> Result<Json<SaveExpenseResponse>, AppError> {
    let config = &state.config;
    require_tool_secret(&headers, config.tool_secret.as_ref())?;

    let row = parse_expense(&body, config.default_household_id.as_deref())?;

    let store_config = config.record_store.as_ref().ok_or(AppError::NotConfigured {
        missing: "SUPABASE_URL/SUPABASE_SERVICE_KEY",
    })?;
    let inserted = RecordStore::new(state.http.clone(), store_config)?
        .insert_expense(&row)
        .await?;

    Ok(Json(SaveExpenseResponse {
        ok: true,
        row: inserted,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{AppConfig, test_config};

    fn app(config: AppConfig) -> Router {
        router().with_state(AppState::new(config).expect("state should build"))
    }

    async fn call(app: Router, authorization: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/expenses")
            .header("content-type", "application/json");
        if let Some(value) = authorization {
            request = request.header("authorization", value);
        }
        let response = app
            .oneshot(
                request
                    .body(Body::from(body.to_string()))
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, serde_json::from_slice(&bytes).expect("response should be JSON"))
    }

    const VALID: &str = r#"{"date":"05-09-2025","amount":250,"category":"Groceries","user_email":"asha@example.com"}"#;

    #[tokio::test]
    async fn stores_normalized_row_and_returns_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/expenses"))
            .and(body_partial_json(json!({
                "date": "2025-09-05",
                "amount": 250.0,
                "currency": "INR",
                "category": "Groceries",
                "household_id": "home-001",
                "source": "text"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{ "id": 1, "date": "2025-09-05" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = call(app(test_config(&server.uri())), Some("Bearer tool-secret"), VALID).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "ok": true, "row": { "id": 1, "date": "2025-09-05" } })
        );
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized_without_store_call() {
        let server = MockServer::start().await;

        let (status, body) = call(app(test_config(&server.uri())), Some("Bearer nope"), VALID).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));
        assert!(server.received_requests().await.expect("recording").is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let server = MockServer::start().await;

        let (status, body) = call(
            app(test_config(&server.uri())),
            Some("Bearer tool-secret"),
            r#"{"amount":250}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing fields: date, amount, user_email" }));
    }

    #[tokio::test]
    async fn unconfigured_store_is_server_not_configured() {
        let server = MockServer::start().await;
        let mut config = test_config(&server.uri());
        config.record_store = None;

        let (status, body) = call(app(config), Some("Bearer tool-secret"), VALID).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server not configured" }));
    }

    #[tokio::test]
    async fn store_failure_is_reported_with_store_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("column \"amount\" is of type numeric"))
            .mount(&server)
            .await;

        let (status, body) = call(app(test_config(&server.uri())), Some("Bearer tool-secret"), VALID).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Supabase error: column \"amount\" is of type numeric" })
        );
    }

    #[tokio::test]
    async fn legacy_function_path_rejects_get() {
        let server = MockServer::start().await;
        let response = app(test_config(&server.uri()))
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/.netlify/functions/save-expense")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
