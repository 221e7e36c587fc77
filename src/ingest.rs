use anyhow::{Context, Result};
use clap::Parser;
use mapbot_knowledge::{HashingEmbedder, IngestionPipeline, KnowledgeConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Chunk a text document, embed every chunk and write the search index.
#[derive(Parser, Debug)]
#[command(name = "mapbot-ingest", version, about)]
struct Args {
    /// UTF-8 text document to index
    path: PathBuf,

    /// Where to write the binary index
    #[arg(long)]
    index: Option<PathBuf>,

    /// Where to write the chunk metadata
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Words per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Words shared by consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Configuration file
    #[arg(long, default_value = "mapbot.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = KnowledgeConfig::load_from(&args.config)
        .with_context(|| format!("invalid configuration in {}", args.config.display()))?;
    if let Some(index) = args.index {
        config.index_path = index;
    }
    if let Some(metadata) = args.metadata {
        config.metadata_path = metadata;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(overlap) = args.overlap {
        config.chunk_overlap = overlap;
    }
    config.validate()?;

    let embedder = HashingEmbedder::new(config.embedding_model.clone(), config.dimension)?;
    let pipeline = IngestionPipeline::new(&config, Arc::new(embedder))?;

    let (_, report) = pipeline
        .ingest(&args.path)
        .await
        .with_context(|| format!("failed to ingest {}", args.path.display()))?;

    println!("Created {} chunks", report.chunks);
    println!("Index built and saved");
    Ok(())
}
