use crate::{
    create_success_response,
    error::{validation_error, ApiResult},
    AppContext,
};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use mapbot_common::{Answer, ApiResponse, SearchHit};
use mapbot_knowledge::{IngestReport, StoreStats};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    pub source: String,
    pub text: String,
}

pub fn routes(context: AppContext) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/search", get(search))
        .route("/ingest", post(ingest))
        .route("/stats", get(stats))
        .with_state(context)
}

async fn ask(
    State(context): State<AppContext>,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<ApiResponse<Answer>>> {
    if request.question.trim().is_empty() {
        return Err(validation_error("question must not be empty"));
    }

    let answer = context.knowledge.answer(&request.question).await?;
    Ok(create_success_response(answer))
}

async fn search(
    State(context): State<AppContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<Vec<SearchHit>>>> {
    if query.q.trim().is_empty() {
        return Err(validation_error("q must not be empty"));
    }

    let k = query.k.unwrap_or(context.knowledge.config().top_k);
    let hits = context.knowledge.search(&query.q, k).await?;
    Ok(create_success_response(hits))
}

async fn ingest(
    State(context): State<AppContext>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<Json<ApiResponse<IngestReport>>> {
    if request.source.trim().is_empty() {
        return Err(validation_error("source must not be empty"));
    }

    let report = context
        .knowledge
        .ingest_text(&request.source, &request.text)
        .await?;
    info!("Ingested '{}' through the API", report.source);
    Ok(create_success_response(report))
}

async fn stats(State(context): State<AppContext>) -> ApiResult<Json<ApiResponse<StoreStats>>> {
    let stats = context.knowledge.stats().await?;
    Ok(create_success_response(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{context_in, get, json_body, post_json};
    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const GUIDE: &str = "Prague Castle stands above the Lesser Town. \
        Charles Bridge crosses the Vltava river to the Old Town.";

    #[tokio::test]
    async fn test_ingest_then_ask() {
        let dir = TempDir::new().unwrap();
        let app = routes(context_in(&dir));

        let response = app
            .clone()
            .oneshot(post_json("/ingest", json!({"source": "guide.txt", "text": GUIDE})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["chunks"], 1);

        let response = app
            .oneshot(post_json("/ask", json!({"question": "Where is Prague Castle?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["answer"], GUIDE);
        assert_eq!(body["data"]["sources"][0]["source"], "guide.txt");
        assert_eq!(body["data"]["sources"][0]["chunk_index"], 0);
    }

    #[tokio::test]
    async fn test_ask_on_empty_index() {
        let dir = TempDir::new().unwrap();
        let response = routes(context_in(&dir))
            .oneshot(post_json("/ask", json!({"question": "anything"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["answer"], "");
        assert_eq!(body["data"]["sources"], json!([]));
    }

    #[tokio::test]
    async fn test_search_respects_k_and_rejects_zero() {
        let dir = TempDir::new().unwrap();
        let app = routes(context_in(&dir));
        app.clone()
            .oneshot(post_json("/ingest", json!({"source": "guide.txt", "text": GUIDE})))
            .await
            .unwrap();

        let response = app.clone().oneshot(get("/search?q=bridge&k=1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let response = app.oneshot(get("/search?q=bridge&k=0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ingest_empty_text_is_rejected() {
        let dir = TempDir::new().unwrap();
        let response = routes(context_in(&dir))
            .oneshot(post_json("/ingest", json!({"source": "blank", "text": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = TempDir::new().unwrap();
        let response = routes(context_in(&dir)).oneshot(get("/stats")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["vectors"], 0);
        assert_eq!(body["data"]["dimension"], 384);
    }
}
