use crate::{create_success_response, AppContext};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use mapbot_common::ApiResponse;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, warn};

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub knowledge: String,
    pub chatbot: String,
}

pub fn routes(context: AppContext) -> Router {
    Lazy::force(&STARTED);
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .with_state(context)
}

// Basic health check endpoint
async fn health_check(State(context): State<AppContext>) -> Json<ApiResponse<HealthCheck>> {
    debug!("Health check requested");

    let health = HealthCheck {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: STARTED.elapsed().as_secs(),
        services: ServiceHealth {
            knowledge: knowledge_status(&context).await.to_string(),
            chatbot: chatbot_status(&context).to_string(),
        },
    };

    create_success_response(health)
}

// Ready once the index can be read; an empty index still serves queries
async fn readiness_check(State(context): State<AppContext>) -> (StatusCode, Json<serde_json::Value>) {
    debug!("Readiness check requested");

    match context.knowledge.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "timestamp": chrono::Utc::now(),
                "checks": {
                    "knowledge": if stats.vectors > 0 { "indexed" } else { "empty" },
                    "chatbot": chatbot_status(&context)
                }
            })),
        ),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "timestamp": chrono::Utc::now(),
                    "checks": {
                        "knowledge": "unreadable",
                        "chatbot": chatbot_status(&context)
                    }
                })),
            )
        }
    }
}

async fn liveness_check() -> Json<serde_json::Value> {
    debug!("Liveness check requested");

    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now(),
        "uptime_seconds": STARTED.elapsed().as_secs()
    }))
}

async fn knowledge_status(context: &AppContext) -> &'static str {
    match context.knowledge.stats().await {
        Ok(stats) if stats.vectors > 0 => "healthy",
        Ok(_) => "empty",
        Err(_) => "unhealthy",
    }
}

fn chatbot_status(context: &AppContext) -> &'static str {
    if context.chatbot.is_trained() {
        "trained"
    } else {
        "untrained"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{context_in, get, json_body};
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let response = routes(context_in(&dir)).oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["services"]["knowledge"], "empty");
        assert_eq!(body["data"]["services"]["chatbot"], "trained");
    }

    #[tokio::test]
    async fn test_readiness_check() {
        let dir = TempDir::new().unwrap();
        let response = routes(context_in(&dir)).oneshot(get("/ready")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn test_readiness_fails_on_corrupt_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.bin"), b"garbage").unwrap();

        let response = routes(context_in(&dir)).oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_liveness_check() {
        let dir = TempDir::new().unwrap();
        let response = routes(context_in(&dir)).oneshot(get("/live")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "alive");
    }
}
