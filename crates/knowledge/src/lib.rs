//! Knowledge base: chunking, embedding, flat vector search and the pipelines around them

pub mod config;
pub mod document_processor;
pub mod embedding;
pub mod ingest;
pub mod knowledge_service;
pub mod semantic_search;
pub mod vector_store;

pub use config::KnowledgeConfig;
pub use document_processor::{chunk_text, Chunk, DocumentProcessor};
pub use embedding::{Embedder, HashingEmbedder};
pub use ingest::{IngestReport, IngestionPipeline};
pub use knowledge_service::KnowledgeService;
pub use semantic_search::{assemble_answer, SemanticSearch};
pub use vector_store::{FlatIndex, StoreStats, VectorStore};
