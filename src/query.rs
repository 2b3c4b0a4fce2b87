//! Semantic search over an indexed game collection, with the hits
//! written up by the chat model.

use crate::embeddings::EmbeddingProvider;
use crate::errors::Result;
use crate::llm::{ChatMessage, ChatProvider, ChatRequest};
use crate::persistence::{IndexStore, LoadedIndex};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

pub const GAME_ANALYST_SYSTEM: &str = "You are a chess expert analyzing games.";
pub const SUMMARY_SYSTEM: &str =
    "You are a helpful chess analysis assistant providing insights about games.";

/// Queries offered by the interactive menu
pub const PREDEFINED_QUERIES: [&str; 8] = [
    "Shabalov's victories as White in major tournaments",
    "Games from World Senior Championships with tactical combinations",
    "Interesting games from Jurmala tournament in 1985",
    "Games where Shabalov defeated higher-rated opponents",
    "Quick victories in less than 25 moves",
    "Notable games with the Sicilian Defense",
    "Tournament games that ended in dramatic draws",
    "Games featuring interesting endgame techniques",
];

const QUERY_CACHE_SIZE: usize = 256;

/// One line typed at the interactive menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    Query(String),
    Exit,
    Invalid,
}

/// Numbers pick a predefined query (the one past the end exits), `exit`
/// quits, and any other text is searched as typed.
pub fn parse_menu_choice(input: &str) -> MenuChoice {
    let input = input.trim();
    if input.is_empty() {
        return MenuChoice::Invalid;
    }
    if input.eq_ignore_ascii_case("exit") {
        return MenuChoice::Exit;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=PREDEFINED_QUERIES.len()).contains(&n) => MenuChoice::Query(PREDEFINED_QUERIES[n - 1].to_string()),
        Ok(n) if n == PREDEFINED_QUERIES.len() + 1 => MenuChoice::Exit,
        Ok(_) => MenuChoice::Invalid,
        Err(_) => MenuChoice::Query(input.to_string()),
    }
}

/// How results come back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Each hit formatted separately
    Console,
    /// One friendly summary across all hits
    Conversational,
}

/// One retrieved game after formatting
#[derive(Debug, Clone)]
pub struct FormattedGame {
    pub rank: usize,
    pub similarity: f32,
    pub source: String,
    pub text: String,
}

impl std::fmt::Display for FormattedGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Game {} (similarity: {:.2})\n{}", self.rank, self.similarity, self.text)
    }
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Results(Vec<FormattedGame>),
    Summary(String),
}

impl SearchOutcome {
    /// Text to display, whatever the mode
    pub fn into_text(self) -> String {
        match self {
            SearchOutcome::Results(games) => games
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            SearchOutcome::Summary(text) => text,
        }
    }
}

pub fn format_game_prompt(game_text: &str) -> String {
    format!(
        "Analyze and format this chess game. Extract key information and provide:\n\
         1. Basic game details (Event, Date, Players, Result, ECO)\n\
         2. A brief description of the game's key moments or strategic themes\n\
         3. Format the output in a clear, readable way\n\n\
         Chess game:\n{}",
        game_text
    )
}

pub fn summary_prompt(combined_results: &str, query: &str) -> String {
    format!(
        "Based on these chess games:\n{combined}\n\n\
         Provide a concise, conversational response that:\n\
         1. Summarizes the key findings\n\
         2. Highlights interesting patterns or insights\n\
         3. Uses a friendly, engaging tone\n\
         4. Keeps the response focused and relevant to the original query: \"{query}\"",
        combined = combined_results,
        query = query,
    )
}

/// Search front end shared by the CLI and the web app
pub struct GameSearch {
    store: IndexStore,
    chat: Arc<dyn ChatProvider>,
    embedder_for_model: Box<dyn Fn(&str) -> Arc<dyn EmbeddingProvider> + Send + Sync>,
    query_cache: Mutex<LruCache<(String, String), Vec<f32>>>,
    loaded: Mutex<Option<Arc<LoadedIndex>>>,
}

impl GameSearch {
    /// `embedder_for_model` yields a provider for the model an index was built with
    pub fn new<F>(store: IndexStore, chat: Arc<dyn ChatProvider>, embedder_for_model: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn EmbeddingProvider> + Send + Sync + 'static,
    {
        let capacity = NonZeroUsize::new(QUERY_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            chat,
            embedder_for_model: Box::new(embedder_for_model),
            query_cache: Mutex::new(LruCache::new(capacity)),
            loaded: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Load (or reuse) the requested index
    fn index_for(&self, dataset_id: Option<&str>) -> Result<Arc<LoadedIndex>> {
        let metadata = self.store.select_metadata(dataset_id)?;
        if let Ok(guard) = self.loaded.lock() {
            if let Some(loaded) = guard.as_ref().filter(|l| l.metadata.index_id == metadata.index_id) {
                return Ok(Arc::clone(loaded));
            }
        }
        let loaded = Arc::new(self.store.load_index(&metadata)?);
        if let Ok(mut guard) = self.loaded.lock() {
            *guard = Some(Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    async fn embed_query(&self, model: &str, query: &str) -> Result<Vec<f32>> {
        let key = (model.to_string(), query.to_string());
        if let Some(hit) = self.query_cache.lock().ok().and_then(|mut c| c.get(&key).cloned()) {
            log::debug!("query embedding cache hit");
            return Ok(hit);
        }
        let embedder = (self.embedder_for_model)(model);
        let vector = embedder.embed(query).await?;
        if let Ok(mut cache) = self.query_cache.lock() {
            cache.put(key, vector.clone());
        }
        Ok(vector)
    }

    async fn format_game(&self, game_text: &str) -> Result<String> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(GAME_ANALYST_SYSTEM),
            ChatMessage::user(format_game_prompt(game_text)),
        ])
        .with_temperature(0.3)
        .with_max_tokens(500);
        self.chat.complete(&request).await
    }

    pub async fn search_games(
        &self,
        query: &str,
        num_results: usize,
        dataset_id: Option<&str>,
        mode: SearchMode,
    ) -> Result<SearchOutcome> {
        let loaded = self.index_for(dataset_id)?;
        log::info!(
            "Searching '{}' in index {} (embedding model {}, LLM {})",
            query,
            loaded.metadata.index_id,
            loaded.metadata.embedding_model,
            self.chat.model()
        );

        let query_embedding = self.embed_query(&loaded.metadata.embedding_model, query).await?;
        let hits = loaded.index.search(&query_embedding, num_results)?;

        let mut games = Vec::with_capacity(hits.len());
        for (rank, hit) in hits.iter().enumerate() {
            let doc = &loaded.documents[hit.index];
            let text = crate::add_context!(
                self.format_game(&doc.description).await,
                format!("While formatting game {}", rank + 1)
            )?;
            games.push(FormattedGame {
                rank: rank + 1,
                similarity: hit.similarity(),
                source: doc.source.clone(),
                text,
            });
        }

        match mode {
            SearchMode::Console => Ok(SearchOutcome::Results(games)),
            SearchMode::Conversational => {
                let combined = games
                    .iter()
                    .map(|g| g.to_string())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                let request = ChatRequest::new(vec![
                    ChatMessage::system(SUMMARY_SYSTEM),
                    ChatMessage::user(summary_prompt(&combined, query)),
                ])
                .with_temperature(0.7);
                Ok(SearchOutcome::Summary(self.chat.complete(&request).await?))
            }
        }
    }
}
