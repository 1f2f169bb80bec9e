//! # LabBot — lab knowledge-base Q&A bot
//!
//! Hybrid RAG over the lab's knowledge base: vector search with keyword
//! reranking, a keyword-search fallback, and static knowledge as the last
//! resort.
//!
//! Usage:
//!   labbot ask "研究室の鍵番号は？"     # Answer one question
//!   labbot sync                          # Incremental index sync
//!   labbot sync --full                   # Re-fetch everything
//!   labbot stats                         # Index and bot statistics

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use labbot_core::config::LabBotConfig;
use labbot_engine::{
    format_reply, Engine, EngineStats, KeywordSearchStage, RagStage, StaticKnowledgeStage,
};
use labbot_engine::stage::AnswerStage;
use labbot_providers::{create_provider, HttpEmbedder};
use labbot_retrieval::VectorIndex;
use labbot_session::SessionStore;
use labbot_source::{read_last_sync, KbClient, SyncService};

#[derive(Parser)]
#[command(name = "labbot", version, about = "🔬 LabBot — lab knowledge-base Q&A bot")]
struct Cli {
    /// Config file path (default: ~/.labbot/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question
    Ask {
        question: String,

        /// Conversation thread id
        #[arg(long, default_value = "cli")]
        thread: String,
    },
    /// Synchronize the vector index with the knowledge base
    Sync {
        /// Re-fetch everything, ignoring the last-sync timestamp
        #[arg(long)]
        full: bool,
    },
    /// Show index and bot statistics
    Stats,
}

fn sync_state_path() -> PathBuf {
    LabBotConfig::home_dir().join("last_sync")
}

fn build_engine(config: &LabBotConfig) -> Result<Engine> {
    let index = Arc::new(VectorIndex::open(&config.index.resolve_db_path())?);
    let embedder = Arc::new(HttpEmbedder::new(&config.embedding));
    let provider: Arc<dyn labbot_core::traits::Provider> =
        Arc::from(create_provider(&config.llm)?);
    let provider_name = provider.name().to_string();

    let mut stages: Vec<Box<dyn AnswerStage>> = vec![Box::new(RagStage::new(
        index.clone(),
        embedder.clone(),
        provider,
        &config.index,
    )?)];

    // Keyword search needs a configured source; without one the chain just
    // goes straight from RAG to static knowledge.
    match KbClient::new(&config.source) {
        Ok(client) => stages.push(Box::new(KeywordSearchStage::new(
            Arc::new(client),
            std::time::Duration::from_secs(config.cache.ttl_secs),
        ))),
        Err(e) => tracing::warn!("Keyword search disabled: {}", e),
    }
    stages.push(Box::new(StaticKnowledgeStage::with_default_entries()));

    Ok(Engine::new(
        stages,
        SessionStore::new(config.session.max_turns),
        index,
        config.embedding.model.clone(),
        provider_name,
        sync_state_path(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "labbot=debug" } else { "labbot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => LabBotConfig::load_from(path)?,
        None => LabBotConfig::load()?,
    };

    match cli.command {
        Command::Ask { question, thread } => {
            let engine = build_engine(&config)?;
            let (answer, urls) = engine.handle_question(&question, &thread).await;
            println!("{}", format_reply(&question, &answer, &urls));
        }
        Command::Sync { full } => {
            let client = KbClient::new(&config.source)?;
            let index = Arc::new(VectorIndex::open(&config.index.resolve_db_path())?);
            let embedder = Arc::new(HttpEmbedder::new(&config.embedding));
            let service = SyncService::new(
                client,
                index,
                embedder,
                config.index.max_chunk_size,
                sync_state_path(),
            );

            let report = service.run(full).await?;
            println!(
                "✅ 同期完了: {}件取得, {}件インデックス ({}チャンク), {}件スキップ",
                report.fetched, report.indexed_documents, report.indexed_chunks, report.skipped
            );
        }
        Command::Stats => {
            let index = VectorIndex::open(&config.index.resolve_db_path())?;
            let stats = EngineStats {
                indexed_chunks: index.len(),
                embedding_model: config.embedding.model.clone(),
                provider_name: format!("{:?}", config.llm.provider).to_lowercase(),
                last_sync: read_last_sync(&sync_state_path()),
                active_threads: 0,
            };
            println!("{}", stats.render());
        }
    }

    Ok(())
}
