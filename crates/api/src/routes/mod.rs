pub mod chat;
pub mod health;
pub mod knowledge;
pub mod pages;

use crate::AppContext;
use axum::Router;
use std::path::Path;

pub fn create_routes(context: AppContext, static_dir: &Path) -> Router {
    Router::new()
        // Map page and its assets
        .merge(pages::routes(static_dir))
        // Health check routes
        .nest("/health", health::routes(context.clone()))
        // Chatbot route kept at its historical path
        .merge(chat::routes(context.clone()))
        .nest("/api/v1/knowledge", knowledge::routes(context))
}

// Fallback handler for unmatched routes
pub async fn not_found_handler() -> axum::http::StatusCode {
    axum::http::StatusCode::NOT_FOUND
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::AppContext;
    use axum::{body::Body, http::Request, response::Response};
    use mapbot_chat::{ChatBot, CorpusSource, CorpusTrainer, DEFAULT_BOT_NAME};
    use mapbot_knowledge::{HashingEmbedder, KnowledgeConfig, KnowledgeService};
    use std::sync::Arc;
    use tempfile::TempDir;

    pub fn context_in(dir: &TempDir) -> AppContext {
        let config = KnowledgeConfig {
            index_path: dir.path().join("index.bin"),
            metadata_path: dir.path().join("metadata.json"),
            ..Default::default()
        };
        let knowledge = KnowledgeService::new(config, Arc::new(HashingEmbedder::default())).unwrap();

        let trainer = CorpusTrainer::new(vec![CorpusSource::Inline {
            name: "english".to_string(),
            conversations: vec![vec!["Hello".to_string(), "Hi there!".to_string()]],
        }]);
        let chatbot = ChatBot::train(DEFAULT_BOT_NAME, &trainer);

        AppContext::new(Arc::new(knowledge), Arc::new(chatbot))
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
