use crate::config::KnowledgeConfig;
use crate::embedding::Embedder;
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::semantic_search::SemanticSearch;
use crate::vector_store::{StoreStats, VectorStore};
use mapbot_common::{Answer, MapbotError, Result, SearchHit};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Embedder, store and pipelines wired together for the server.
///
/// Ingestion builds a fresh store on the side and swaps it in under the write
/// lock, so readers never see a half-built index. Ingests run one at a time:
/// the files on disk and the store in memory always come from the same one.
pub struct KnowledgeService {
    config: KnowledgeConfig,
    store: Arc<RwLock<VectorStore>>,
    search: SemanticSearch,
    pipeline: IngestionPipeline,
    ingest_lock: Mutex<()>,
}

impl KnowledgeService {
    pub fn new(config: KnowledgeConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        config.validate()?;
        if embedder.dimension() != config.dimension {
            return Err(MapbotError::DimensionMismatch {
                expected: config.dimension,
                actual: embedder.dimension(),
            });
        }

        let store = Arc::new(RwLock::new(VectorStore::new(
            &config.index_path,
            &config.metadata_path,
            config.dimension,
        )));
        let search = SemanticSearch::new(
            embedder.clone(),
            store.clone(),
            config.top_k,
            config.answer_hits,
        );
        let pipeline = IngestionPipeline::new(&config, embedder)?
            .with_expected_dimension(config.dimension);

        Ok(Self {
            config,
            store,
            search,
            pipeline,
            ingest_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    /// Hydrates the store from disk ahead of the first query.
    pub async fn warm_up(&self) -> Result<StoreStats> {
        let _guard = self.ingest_lock.lock().await;
        let mut store = self.store.write().await;
        store.load()?;
        store.stats()
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;
        let (built, report) = self.pipeline.ingest(path).await?;
        self.swap(built, &report).await;
        Ok(report)
    }

    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;
        let (built, report) = self.pipeline.ingest_text(source, text).await?;
        self.swap(built, &report).await;
        Ok(report)
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.search.search(query, k).await
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        self.search.answer(question).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.read().await.stats()
    }

    // Caller holds the ingest lock
    async fn swap(&self, built: VectorStore, report: &IngestReport) {
        *self.store.write().await = built;
        info!("Swapped in index for '{}' ({} chunks)", report.source, report.chunks);
    }
}
