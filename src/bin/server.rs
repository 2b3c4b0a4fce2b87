use chess_ai_assistant::config::DEFAULT_SECRETS_FILE;
use chess_ai_assistant::{server, AssistantConfig, ChessAssistant};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Serve the chess buddy and player analysis in the browser", long_about = None)]
struct Args {
    /// Secrets file with KEY=VALUE lines
    #[arg(short, long, default_value = DEFAULT_SECRETS_FILE)]
    secrets: PathBuf,

    /// Address to listen on (overrides CHESS_ASSISTANT_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Directory holding index metadata and databases
    #[arg(long)]
    embeddings_dir: Option<PathBuf>,

    /// Directory for saved games
    #[arg(long)]
    saves_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = AssistantConfig::load(&args.secrets)?;
    if let Some(bind) = args.bind {
        config = config.with_bind(bind);
    }
    if let Some(dir) = args.embeddings_dir {
        config = config.with_embeddings_dir(dir);
    }
    if let Some(dir) = args.saves_dir {
        config = config.with_saves_dir(dir);
    }

    log::info!(
        "Chat model {}, embeddings in {}, saves in {}",
        config.chat_model,
        config.embeddings_dir.display(),
        config.saves_dir.display()
    );
    let assistant = ChessAssistant::from_config(&config)?;
    server::serve(assistant, config.bind).await?;
    Ok(())
}
