use crate::document_processor::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedding::{DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL};
use crate::vector_store::{DEFAULT_INDEX_PATH, DEFAULT_METADATA_PATH};
use mapbot_common::{MapbotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "mapbot.toml";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_ANSWER_HITS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    pub dimension: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub answer_hits: usize,
    pub embedding_model: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            answer_hits: DEFAULT_ANSWER_HITS,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl KnowledgeConfig {
    /// Defaults, then `mapbot.toml` if present, then `MAPBOT_*` variables.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(file: impl AsRef<Path>) -> Result<Self> {
        let defaults = Self::default();
        let embedding_model = std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model);

        let settings = config::Config::builder()
            .set_default("index_path", defaults.index_path.to_string_lossy().to_string())
            .and_then(|b| b.set_default("metadata_path", defaults.metadata_path.to_string_lossy().to_string()))
            .and_then(|b| b.set_default("dimension", defaults.dimension as i64))
            .and_then(|b| b.set_default("chunk_size", defaults.chunk_size as i64))
            .and_then(|b| b.set_default("chunk_overlap", defaults.chunk_overlap as i64))
            .and_then(|b| b.set_default("top_k", defaults.top_k as i64))
            .and_then(|b| b.set_default("answer_hits", defaults.answer_hits as i64))
            .and_then(|b| b.set_default("embedding_model", embedding_model))
            .map_err(config_error)?
            .add_source(config::File::from(file.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("MAPBOT"))
            .build()
            .map_err(config_error)?;

        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(MapbotError::InvalidChunking {
                window: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        if self.dimension == 0 {
            return Err(MapbotError::Configuration("dimension must be positive".to_string()));
        }
        if self.top_k == 0 {
            return Err(MapbotError::Configuration("top_k must be positive".to_string()));
        }
        Ok(())
    }
}

fn config_error(err: config::ConfigError) -> MapbotError {
    MapbotError::Configuration(err.to_string())
}
