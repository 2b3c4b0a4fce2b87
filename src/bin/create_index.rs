use chess_ai_assistant::config::DEFAULT_SECRETS_FILE;
use chess_ai_assistant::errors::resilience::RetryConfig;
use chess_ai_assistant::{
    chunk_documents, create_embeddings, http_client, load_pgn_files, AssistantConfig, IndexStore,
    OpenAiEmbeddings,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about = "Build a searchable index from a directory of PGN files", long_about = None)]
struct Args {
    /// Secrets file with KEY=VALUE lines
    #[arg(short, long, default_value = DEFAULT_SECRETS_FILE)]
    secrets: PathBuf,

    /// Directory scanned for .pgn files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Output directory for the index and its metadata
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Embedding model (overrides EMBEDDING_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Attempts per embedding request
    #[arg(long, default_value = "3")]
    max_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = AssistantConfig::load(&args.secrets)?;
    if let Some(dir) = args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(dir) = args.output_dir {
        config = config.with_embeddings_dir(dir);
    }
    if let Some(model) = args.model {
        config.embedding_model = model;
    }

    let start = Instant::now();
    let games = load_pgn_files(&config.data_dir)?;
    if games.is_empty() {
        return Err(format!("No games found under {}", config.data_dir.display()).into());
    }
    let documents = chunk_documents(&games);
    println!(
        "Loaded {} games into {} unique documents from {}",
        games.len(),
        documents.len(),
        config.data_dir.display()
    );

    let client = http_client(&config)?;
    let embedder = OpenAiEmbeddings::from_config(client, &config);
    let retry = RetryConfig {
        max_attempts: args.max_attempts.max(1),
        ..RetryConfig::default()
    };
    let embeddings = create_embeddings(&documents, &embedder, &retry).await?;

    let store = IndexStore::new(config.embeddings_dir.clone());
    let metadata = store.save_index(&documents, &embeddings, &config.embedding_model)?;

    println!("Index {} created in {:.1}s", metadata.index_id, start.elapsed().as_secs_f64());
    println!("  • Dataset: {}", metadata.dataset_id);
    println!("  • Documents: {}", metadata.document_count);
    println!("  • Dimension: {}", metadata.dimension);
    println!("  • Model: {}", metadata.embedding_model);
    println!("  • Location: {}", store.root().display());
    Ok(())
}
