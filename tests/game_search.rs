use async_trait::async_trait;
use chess_ai_assistant::errors::resilience::RetryConfig;
use chess_ai_assistant::errors::Result;
use chess_ai_assistant::query::SUMMARY_SYSTEM;
use chess_ai_assistant::{
    chunk_documents, create_embeddings, load_pgn_files, AnalysisChat, ChatProvider, ChatRequest, EmbeddingProvider,
    GameSearch, IndexStore, SearchMode, SearchOutcome,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const GAMES: &str = r#"[Event "Sicilian Open"]
[Site "Riga"]
[Date "1985.07.01"]
[White "Shabalov, Alexander"]
[Black "Tal, Mikhail"]
[Result "1-0"]
[ECO "B20"]

1. e4 c5 2. Nf3 d6 1-0

[Event "Jurmala"]
[Site "Jurmala"]
[Date "1985.08.02"]
[White "Petrosian, Tigran"]
[Black "Smyslov, Vasily"]
[Result "1/2-1/2"]
[ECO "D30"]

1. d4 d5 2. c4 e6 1/2-1/2
"#;

/// One dimension per keyword
struct KeywordEmbedder {
    calls: AtomicUsize,
}

const KEYWORDS: [&str; 3] = ["Sicilian", "Jurmala", "Shabalov"];

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model(&self) -> &str {
        "keywords"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(KEYWORDS
            .iter()
            .map(|k| if text.contains(k) { 1.0 } else { 0.0 })
            .collect())
    }
}

/// Echoes the game it was asked to format, or a fixed summary
struct EchoChat;

#[async_trait]
impl ChatProvider for EchoChat {
    fn model(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        if request.system_prompt() == Some(SUMMARY_SYSTEM) {
            return Ok("Shabalov played the Sicilian sharply.".to_string());
        }
        let user = &request.messages[1].content;
        let game = user.split("Chess game:\n").nth(1).unwrap_or_default();
        Ok(format!("Formatted: {}", game.split(" Site:").next().unwrap_or_default()))
    }
}

async fn build_index(dir: &Path, embedder: &KeywordEmbedder) -> IndexStore {
    let data = dir.join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("games.pgn"), GAMES).unwrap();

    let games = load_pgn_files(&data).unwrap();
    assert_eq!(games.len(), 2);
    let documents = chunk_documents(&games);
    let embeddings = create_embeddings(&documents, embedder, &RetryConfig::no_retry())
        .await
        .unwrap();

    let store = IndexStore::new(dir.join("embeddings"));
    let metadata = store.save_index(&documents, &embeddings, embedder.model()).unwrap();
    assert_eq!(metadata.document_count, 2);
    assert_eq!(metadata.dimension, KEYWORDS.len());
    store
}

fn search(store: IndexStore, embedder: Arc<KeywordEmbedder>) -> GameSearch {
    GameSearch::new(store, Arc::new(EchoChat), move |model: &str| -> Arc<dyn EmbeddingProvider> {
        assert_eq!(model, "keywords");
        embedder.clone()
    })
}

#[tokio::test]
async fn test_console_search_ranks_closest_game_first() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) });
    let store = build_index(dir.path(), &embedder).await;
    let search = search(store, embedder);

    let outcome = search
        .search_games("Sicilian games of Shabalov", 5, None, SearchMode::Console)
        .await
        .unwrap();
    let SearchOutcome::Results(games) = outcome else {
        panic!("expected per-game results");
    };
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].rank, 1);
    assert_eq!(games[0].source, "games.pgn");
    assert_eq!(games[0].text, "Formatted: Event: Sicilian Open");
    assert!(games[0].similarity > games[1].similarity);
    assert!(games[0].to_string().starts_with("Game 1 (similarity: "));
}

#[tokio::test]
async fn test_query_embeddings_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) });
    let store = build_index(dir.path(), &embedder).await;
    let indexed = embedder.calls.load(Ordering::SeqCst);
    let search = search(store, embedder.clone());

    for _ in 0..3 {
        search.search_games("Jurmala", 1, None, SearchMode::Console).await.unwrap();
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), indexed + 1);
}

#[tokio::test]
async fn test_conversational_search_and_analysis_chat() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) });
    let store = build_index(dir.path(), &embedder).await;
    let search = search(store, embedder);

    let text = search
        .search_games("Sicilian", 2, None, SearchMode::Conversational)
        .await
        .unwrap()
        .into_text();
    assert_eq!(text, "Shabalov played the Sicilian sharply.");

    let mut chat = AnalysisChat::new();
    assert!(chat.ask(&search, "Sicilian", true).await);
    assert!(!chat.ask(&search, "Sicilian", true).await);
    assert!(chat.ask(&search, "Sicilian", false).await);
    assert_eq!(chat.messages().len(), 4);
    assert_eq!(chat.messages()[1].content, "Shabalov played the Sicilian sharply.");

    chat.clear();
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn test_unknown_dataset_falls_back_and_missing_index_reports() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(KeywordEmbedder { calls: AtomicUsize::new(0) });

    let empty = search(IndexStore::new(dir.path().join("nothing")), embedder.clone());
    let mut chat = AnalysisChat::new();
    chat.ask(&empty, "Jurmala", true).await;
    assert!(chat.messages()[1].content.contains("No embeddings found"));

    let store = build_index(dir.path(), &embedder).await;
    let search = search(store, embedder);
    let outcome = search
        .search_games("Jurmala", 1, Some("no-such-dataset"), SearchMode::Console)
        .await
        .unwrap();
    let SearchOutcome::Results(games) = outcome else {
        panic!("expected per-game results");
    };
    assert_eq!(games[0].text, "Formatted: Event: Jurmala");
}
