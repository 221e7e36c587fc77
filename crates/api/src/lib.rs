pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

use axum::Json;
use mapbot_chat::ChatBot;
use mapbot_common::{ApiResponse, MapbotError, Result};
use mapbot_knowledge::KnowledgeService;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use server::ApiServer;

// Re-export common types
pub use mapbot_common;

pub const DEFAULT_CONFIG_FILE: &str = "mapbot.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub corpus_dir: PathBuf,
    pub corpora: Vec<String>,
    pub static_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            corpus_dir: PathBuf::from("corpus"),
            corpora: vec!["czech".to_string(), "english".to_string()],
            static_dir: PathBuf::from("static"),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Defaults, then `mapbot.toml` if present, then `MAPBOT_*` variables.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(file: impl AsRef<Path>) -> Result<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("host", defaults.host)
            .and_then(|b| b.set_default("port", defaults.port as i64))
            .and_then(|b| b.set_default("cors_origins", defaults.cors_origins))
            .and_then(|b| b.set_default("corpus_dir", defaults.corpus_dir.to_string_lossy().to_string()))
            .and_then(|b| b.set_default("corpora", defaults.corpora))
            .and_then(|b| b.set_default("static_dir", defaults.static_dir.to_string_lossy().to_string()))
            .and_then(|b| b.set_default("request_timeout_secs", defaults.request_timeout_secs as i64))
            .map_err(config_error)?
            .add_source(config::File::from(file.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("MAPBOT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins")
                    .with_list_parse_key("corpora"),
            )
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_error(err: config::ConfigError) -> MapbotError {
    MapbotError::Configuration(err.to_string())
}

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppContext {
    pub knowledge: Arc<KnowledgeService>,
    pub chatbot: Arc<ChatBot>,
}

impl AppContext {
    pub fn new(knowledge: Arc<KnowledgeService>, chatbot: Arc<ChatBot>) -> Self {
        Self { knowledge, chatbot }
    }
}

// Common API utilities
pub fn create_success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}
