use crate::{error::validation_error, error::ApiResult, AppContext};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub response: String,
}

pub fn routes(context: AppContext) -> Router {
    Router::new()
        .route("/get_response", post(get_response))
        .with_state(context)
}

async fn get_response(
    State(context): State<AppContext>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    if request.message.trim().is_empty() {
        return Err(validation_error("message must not be empty"));
    }

    debug!("Chat message received ({} chars)", request.message.len());
    let response = context.chatbot.respond(&request.message);
    Ok(Json(ChatReply { response }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{context_in, json_body, post_json};
    use axum::http::StatusCode;
    use mapbot_chat::DEFAULT_RESPONSE;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_known_statement() {
        let dir = TempDir::new().unwrap();
        let app = routes(context_in(&dir));

        let response = app
            .oneshot(post_json("/get_response", json!({"message": "hello"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["response"], "Hi there!");
    }

    #[tokio::test]
    async fn test_unknown_statement_gets_default() {
        let dir = TempDir::new().unwrap();
        let app = routes(context_in(&dir));

        let response = app
            .oneshot(post_json("/get_response", json!({"message": "tram schedule"})))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["response"], DEFAULT_RESPONSE);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let dir = TempDir::new().unwrap();
        let app = routes(context_in(&dir));

        let response = app
            .oneshot(post_json("/get_response", json!({"message": "  "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
