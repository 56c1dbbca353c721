//! Axum server setup and router configuration.

use crate::api::{callable, webhook};
use crate::shutdown::shutdown_signal;
use crate::state::AppState;
use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/callable", callable::router())
        .route("/webhooks/payments", post(webhook::payment_webhook))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run the server with graceful shutdown support.
pub async fn run_server(router: Router, addr: SocketAddr) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::{
        AuthConfig, ConfigStore, DEFAULT_GATEWAY_BASE_URL, GatewayConfig, ServerConfig,
        SharedConfig, SweeperConfig,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use gonggoo_sdk::signature::issue_session_token;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    const SESSION_SECRET: &[u8] = b"test-session-secret";

    /// State over a pool that never connects. Only paths that stop before
    /// touching the database can be exercised.
    fn test_state() -> AppState {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(100))
            .connect_lazy("postgres://gonggoo@localhost/gonggoo_test")
            .unwrap();
        let config = SharedConfig::new(
            ServerConfig {
                listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            },
            GatewayConfig {
                base_url: url::Url::parse(DEFAULT_GATEWAY_BASE_URL).unwrap(),
                secret_key: "test_sk".to_string(),
                timeout: Duration::from_secs(1),
            },
            AuthConfig::new(SESSION_SECRET.to_vec()),
        );
        AppState::new(
            pool,
            reqwest::Client::new(),
            config,
            ConfigStore::new(SweeperConfig::default()),
        )
    }

    fn json_post(uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = build_router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_webhook_rejects_other_methods() {
        let response = build_router(test_state())
            .oneshot(
                Request::get("/webhooks/payments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_unknown_event() {
        let body = r#"{"eventType":"DEPOSIT_CALLBACK","data":{}}"#;
        let response = build_router(test_state())
            .oneshot(
                json_post("/webhooks/payments")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_acknowledges_malformed_body() {
        let response = build_router(test_state())
            .oneshot(
                json_post("/webhooks/payments")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_change_without_payment_key_fails() {
        let body = r#"{"eventType":"PAYMENT_STATUS_CHANGED","data":{"status":"DONE"}}"#;
        let response = build_router(test_state())
            .oneshot(
                json_post("/webhooks/payments")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_callable_requires_session_token() {
        let body = r#"{"paymentKey":"pk","orderId":"o","amount":1000}"#;
        let response = build_router(test_state())
            .oneshot(
                json_post("/api/v1/callable/confirmPayment")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["status"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_callable_rejects_token_signed_with_other_secret() {
        let token = issue_session_token("user-1", time::Duration::minutes(5), b"other-secret");
        let response = build_router(test_state())
            .oneshot(
                json_post("/api/v1/callable/getUserRefunds")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callable_validates_required_fields() {
        let token = issue_session_token("user-1", time::Duration::minutes(5), SESSION_SECRET);
        let body = r#"{"paymentKey":"pk","amount":1000}"#;
        let response = build_router(test_state())
            .oneshot(
                json_post("/api/v1/callable/confirmPayment")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["status"], "INVALID_ARGUMENT");
        assert_eq!(json["error"]["message"], "orderId is required");
    }

    #[tokio::test]
    async fn test_callable_rejects_malformed_json() {
        let token = issue_session_token("user-1", time::Duration::minutes(5), SESSION_SECRET);
        let response = build_router(test_state())
            .oneshot(
                json_post("/api/v1/callable/cancelPayment")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from("[1, 2"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["status"], "INVALID_ARGUMENT");
    }
}
