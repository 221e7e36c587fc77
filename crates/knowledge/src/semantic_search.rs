use crate::embedding::Embedder;
use crate::vector_store::VectorStore;
use mapbot_common::{Answer, Result, SearchHit};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Query side of the pipeline: embed, search, assemble.
pub struct SemanticSearch {
    embedder: Arc<dyn Embedder>,
    store: Arc<RwLock<VectorStore>>,
    top_k: usize,
    answer_hits: usize,
}

impl SemanticSearch {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<RwLock<VectorStore>>,
        top_k: usize,
        answer_hits: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k,
            answer_hits,
        }
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let embedding = self.embedder.embed(query).await?;
        let store = self.store.read().await;
        let hits = store.search_one(&embedding, k)?;
        debug!("Query matched {} chunks", hits.len());
        Ok(hits)
    }

    /// Top-`top_k` search; the first `answer_hits` texts form the answer.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let hits = self.search(question, self.top_k).await?;
        Ok(assemble_answer(&hits, self.answer_hits))
    }
}

pub fn assemble_answer(hits: &[SearchHit], answer_hits: usize) -> Answer {
    let answer = hits
        .iter()
        .take(answer_hits)
        .map(|hit| hit.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    Answer {
        answer,
        sources: hits.iter().map(|hit| hit.metadata.clone()).collect(),
    }
}
