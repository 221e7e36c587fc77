use anyhow::{Context, Result};
use mapbot_api::{ApiConfig, ApiServer, AppContext};
use mapbot_chat::{ChatBot, CorpusTrainer, DEFAULT_BOT_NAME};
use mapbot_knowledge::{HashingEmbedder, KnowledgeConfig, KnowledgeService};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mapbot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MapBot...");

    let knowledge_config = KnowledgeConfig::load().context("invalid knowledge configuration")?;
    let api_config = ApiConfig::load().context("invalid API configuration")?;

    let embedder = HashingEmbedder::new(
        knowledge_config.embedding_model.clone(),
        knowledge_config.dimension,
    )?;
    let knowledge = KnowledgeService::new(knowledge_config, Arc::new(embedder))?;

    // The server still answers with an empty index; queries hydrate lazily
    match knowledge.warm_up().await {
        Ok(stats) => info!(
            "Knowledge base ready: {} vectors, {} metadata records",
            stats.vectors, stats.metadata
        ),
        Err(e) => error!("Failed to load knowledge base: {}", e),
    }

    let trainer = CorpusTrainer::from_dir(&api_config.corpus_dir, &api_config.corpora);
    let chatbot = ChatBot::train(DEFAULT_BOT_NAME, &trainer);
    match chatbot.corpus() {
        Some(corpus) => info!("{} answers from corpus '{}'", chatbot.name(), corpus),
        None => info!("{} starts untrained", chatbot.name()),
    }

    let context = AppContext::new(Arc::new(knowledge), Arc::new(chatbot));
    let server = ApiServer::new(api_config, context);
    server.start().await?;

    Ok(())
}
