//! # Chess AI Assistant
//!
//! A chess buddy in the browser and a player-analysis search over your own
//! PGN collection, both backed by a hosted chat-completion model.
//!
//! ## Features
//!
//! - **Chess Buddy**: play against the model. The board state and a chosen
//!   personality are turned into a prompt; the reply is shown verbatim and
//!   its leading move is played when it is legal.
//! - **Saved games**: move history, per-move commentary and the personality
//!   label in one JSON file.
//! - **Player Analysis**: PGN files are chunked, embedded and stored in a
//!   flat L2 index; questions are answered from the closest games.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chess_ai_assistant::{AssistantConfig, ChessAssistant};
//!
//! # async fn run() -> chess_ai_assistant::Result<()> {
//! let config = AssistantConfig::load(".env")?;
//! let assistant = ChessAssistant::from_config(&config)?;
//!
//! assistant.user_move("e2e4").await?;
//! let reply = assistant.buddy_move().await?;
//! println!("{}", reply.raw);
//! # Ok(())
//! # }
//! ```

pub mod analysis_chat;
pub mod buddy;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod persistence;
pub mod personality;
pub mod pgn_loader;
pub mod query;
pub mod saved_game;
pub mod server;
pub mod session;
pub mod similarity_search;

pub use analysis_chat::{AnalysisChat, EXAMPLE_QUERIES};
pub use buddy::BuddyReply;
pub use chunking::{chunk_documents, chunk_text, ChunkedDocument};
pub use config::AssistantConfig;
pub use embeddings::{create_embeddings, EmbeddingProvider, OpenAiEmbeddings};
pub use errors::{AssistantError, Result};
pub use llm::{ChatMessage, ChatProvider, ChatRequest, OpenAiChat};
pub use persistence::{IndexMetadata, IndexStore, LoadedIndex};
pub use personality::Personality;
pub use pgn_loader::{load_pgn_files, GameDocument};
pub use query::{GameSearch, SearchMode, SearchOutcome};
pub use saved_game::SavedGame;
pub use session::{GameSession, SessionView};
pub use similarity_search::{SearchHit, VectorIndex};

use crate::llm::ChatMessage as Message;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Build the shared HTTP client
pub fn http_client(config: &AssistantConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(AssistantError::from)
}

/// One user's assistant: game session, analysis chat and the providers
/// behind them. Every interaction takes the matching lock for its whole
/// duration, outbound call included.
pub struct ChessAssistant {
    chat: Arc<dyn ChatProvider>,
    search: GameSearch,
    session: Mutex<GameSession>,
    analysis: Mutex<AnalysisChat>,
    saves_dir: PathBuf,
}

impl ChessAssistant {
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let client = http_client(config)?;
        let chat: Arc<dyn ChatProvider> = Arc::new(OpenAiChat::from_config(client.clone(), config));
        let base = OpenAiEmbeddings::from_config(client, config);
        let embedder = move |model: &str| -> Arc<dyn EmbeddingProvider> { Arc::new(base.with_model(model)) };
        Ok(Self::with_providers(
            chat,
            embedder,
            IndexStore::new(config.embeddings_dir.clone()),
            config.saves_dir.clone(),
        ))
    }

    pub fn with_providers<F>(
        chat: Arc<dyn ChatProvider>,
        embedder_for_model: F,
        store: IndexStore,
        saves_dir: PathBuf,
    ) -> Self
    where
        F: Fn(&str) -> Arc<dyn EmbeddingProvider> + Send + Sync + 'static,
    {
        Self {
            search: GameSearch::new(store, Arc::clone(&chat), embedder_for_model),
            chat,
            session: Mutex::new(GameSession::default()),
            analysis: Mutex::new(AnalysisChat::new()),
            saves_dir,
        }
    }

    pub fn search(&self) -> &GameSearch {
        &self.search
    }

    pub fn chat_model(&self) -> &str {
        self.chat.model()
    }

    pub fn saves_dir(&self) -> &PathBuf {
        &self.saves_dir
    }

    pub async fn game(&self) -> SessionView {
        self.session.lock().await.view()
    }

    /// Fresh board, keeping the current personality
    pub async fn new_game(&self) -> SessionView {
        let mut session = self.session.lock().await;
        *session = GameSession::new(session.personality());
        session.view()
    }

    pub async fn user_move(&self, uci: &str) -> Result<SessionView> {
        let mut session = self.session.lock().await;
        session.apply_user_move(uci)?;
        Ok(session.view())
    }

    pub async fn buddy_move(&self) -> Result<BuddyReply> {
        let mut session = self.session.lock().await;
        session.request_buddy_move(self.chat.as_ref()).await
    }

    pub async fn set_personality(&self, label: &str) -> Result<SessionView> {
        let personality: Personality = label.parse()?;
        let mut session = self.session.lock().await;
        session.set_personality(personality);
        Ok(session.view())
    }

    pub async fn save_game(&self, name: &str) -> Result<PathBuf> {
        let path = saved_game::save_path(&self.saves_dir, name)?;
        let saved = self.session.lock().await.to_saved();
        saved.save(&path)?;
        Ok(path)
    }

    /// Replace the session with a saved game. On any error the current
    /// session is kept.
    pub async fn load_game(&self, name: &str) -> Result<SessionView> {
        let path = saved_game::save_path(&self.saves_dir, name)?;
        let restored = GameSession::from_saved(&SavedGame::load(&path)?)?;
        let mut session = self.session.lock().await;
        *session = restored;
        Ok(session.view())
    }

    pub fn list_saves(&self) -> Result<Vec<String>> {
        saved_game::list_saves(&self.saves_dir)
    }

    pub async fn analysis_messages(&self) -> Vec<Message> {
        self.analysis.lock().await.messages().to_vec()
    }

    pub async fn ask_analysis(&self, query: &str, from_input: bool) -> Vec<Message> {
        let mut analysis = self.analysis.lock().await;
        analysis.ask(&self.search, query, from_input).await;
        analysis.messages().to_vec()
    }

    pub async fn clear_analysis(&self) {
        self.analysis.lock().await.clear();
    }
}
