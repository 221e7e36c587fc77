use crate::config::KnowledgeConfig;
use crate::document_processor::DocumentProcessor;
use crate::embedding::{embed_all, Embedder};
use crate::vector_store::VectorStore;
use mapbot_common::{ChunkMetadata, MapbotError, Result};
use ndarray::Array2;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub chunks: usize,
    pub dimension: usize,
}

/// Chunk, embed and index one document, replacing whatever the store held.
pub struct IngestionPipeline {
    processor: DocumentProcessor,
    embedder: Arc<dyn Embedder>,
    index_path: PathBuf,
    metadata_path: PathBuf,
    expected_dimension: Option<usize>,
}

impl IngestionPipeline {
    pub fn new(config: &KnowledgeConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Ok(Self {
            processor: DocumentProcessor::new(config.chunk_size, config.chunk_overlap)?,
            embedder,
            index_path: config.index_path.clone(),
            metadata_path: config.metadata_path.clone(),
            expected_dimension: None,
        })
    }

    /// Rejects embeddings of any other width before anything is written.
    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    pub async fn ingest(&self, path: &Path) -> Result<(VectorStore, IngestReport)> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MapbotError::io(path, e))?;
        self.ingest_text(&path.to_string_lossy(), &text).await
    }

    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<(VectorStore, IngestReport)> {
        let chunks = self.processor.chunk_document(source, text)?;
        info!("Created {} chunks", chunks.len());
        if chunks.is_empty() {
            return Err(MapbotError::EmptyDocument(source.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embed_all(self.embedder.as_ref(), &texts).await?;
        let vectors = stack(embeddings)?;
        let dimension = vectors.ncols();
        if let Some(expected) = self.expected_dimension {
            if dimension != expected {
                return Err(MapbotError::DimensionMismatch {
                    expected,
                    actual: dimension,
                });
            }
        }

        let metadatas = chunks
            .into_iter()
            .map(|chunk| ChunkMetadata {
                source: chunk.source,
                chunk_index: chunk.index,
                text: chunk.text,
            })
            .collect::<Vec<_>>();
        let count = metadatas.len();

        let mut store = VectorStore::new(&self.index_path, &self.metadata_path, dimension);
        store.build(vectors, metadatas)?;
        info!("Index built and saved");

        Ok((
            store,
            IngestReport {
                source: source.to_string(),
                chunks: count,
                dimension,
            },
        ))
    }
}

// Row-stacks embeddings; the first one fixes the dimension
fn stack(embeddings: Vec<Vec<f32>>) -> Result<Array2<f32>> {
    let dimension = embeddings.first().map_or(0, Vec::len);
    let rows = embeddings.len();

    let mut flat = Vec::with_capacity(rows * dimension);
    for embedding in embeddings {
        if embedding.len() != dimension {
            return Err(MapbotError::DimensionMismatch {
                expected: dimension,
                actual: embedding.len(),
            });
        }
        flat.extend(embedding);
    }

    Array2::from_shape_vec((rows, dimension), flat).map_err(|e| MapbotError::Internal(e.to_string()))
}
