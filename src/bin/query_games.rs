use chess_ai_assistant::config::DEFAULT_SECRETS_FILE;
use chess_ai_assistant::query::{parse_menu_choice, MenuChoice, PREDEFINED_QUERIES};
use chess_ai_assistant::{AssistantConfig, ChessAssistant, SearchMode};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Run predefined searches against the game index", long_about = None)]
struct Args {
    /// Secrets file with KEY=VALUE lines
    #[arg(short, long, default_value = DEFAULT_SECRETS_FILE)]
    secrets: PathBuf,

    /// Index directory
    #[arg(short, long)]
    embeddings_dir: Option<PathBuf>,

    /// Dataset to search (newest index when omitted)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Games per query
    #[arg(short, long, default_value = "5")]
    num_results: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut config = AssistantConfig::load(&args.secrets)?;
    if let Some(dir) = args.embeddings_dir {
        config = config.with_embeddings_dir(dir);
    }
    let assistant = ChessAssistant::from_config(&config)?;
    let search = assistant.search();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("\nChess Game Search");
        println!("=================");
        for (i, query) in PREDEFINED_QUERIES.iter().enumerate() {
            println!("{}. {}", i + 1, query);
        }
        println!("{}. Exit", PREDEFINED_QUERIES.len() + 1);
        print!("\nEnter choice number or type your own search query: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let query = match parse_menu_choice(&line?) {
            MenuChoice::Query(query) => query,
            MenuChoice::Exit => break,
            MenuChoice::Invalid => {
                println!("Invalid selection, try again.");
                continue;
            }
        };

        println!("\nSearching: {}\n", query);
        match search
            .search_games(&query, args.num_results, args.dataset.as_deref(), SearchMode::Console)
            .await
        {
            Ok(outcome) => println!("{}", outcome.into_text()),
            Err(e) => println!("Search failed: {}", e),
        }
    }
    println!("Goodbye!");
    Ok(())
}
