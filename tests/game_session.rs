use async_trait::async_trait;
use chess_ai_assistant::errors::Result;
use chess_ai_assistant::{
    AssistantError, ChatProvider, ChatRequest, ChessAssistant, EmbeddingProvider, IndexStore, Personality,
    SavedGame,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Replays scripted replies; `None` fails the call
struct ScriptedChat {
    replies: Mutex<Vec<Option<&'static str>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    fn new(mut replies: Vec<Option<&'static str>>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn system_prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.system_prompt().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop().flatten() {
            Some(reply) => Ok(reply.to_string()),
            None => Err(AssistantError::HttpError {
                status: Some(503),
                message: "service unavailable".into(),
            }),
        }
    }
}

struct Offline;

#[async_trait]
impl EmbeddingProvider for Offline {
    fn model(&self) -> &str {
        "offline"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(chess_ai_assistant::api_error!("offline"))
    }
}

fn assistant(dir: &Path, chat: Arc<ScriptedChat>) -> ChessAssistant {
    let embedder = |_: &str| -> Arc<dyn EmbeddingProvider> { Arc::new(Offline) };
    ChessAssistant::with_providers(chat, embedder, IndexStore::new(dir.join("embeddings")), dir.join("saves"))
}

#[tokio::test]
async fn test_save_then_load_restores_game() {
    let dir = tempfile::tempdir().unwrap();
    let chat = ScriptedChat::new(vec![Some("e5 Symmetry is comfort."), Some("Nc6 Defending e5.")]);
    let first = assistant(dir.path(), chat);

    first.set_personality("Coach").await.unwrap();
    first.user_move("e2e4").await.unwrap();
    first.buddy_move().await.unwrap();
    first.user_move("g1f3").await.unwrap();
    first.buddy_move().await.unwrap();
    let before = first.game().await;
    first.save_game("italian").await.unwrap();

    let second = assistant(dir.path(), ScriptedChat::new(vec![]));
    let after = second.load_game("italian").await.unwrap();

    assert_eq!(after.moves, before.moves);
    assert_eq!(after.analysis, before.analysis);
    assert_eq!(after.personality, "Coach");
    assert_eq!(after.fen, before.fen);
    assert_eq!(second.list_saves().unwrap(), vec!["italian"]);
}

#[tokio::test]
async fn test_personality_switch_changes_only_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let chat = ScriptedChat::new(vec![Some("e5 Fine."), Some("Nc6 Sure.")]);
    let app = assistant(dir.path(), chat.clone());

    app.user_move("e2e4").await.unwrap();
    app.buddy_move().await.unwrap();
    let before = app.game().await;

    app.set_personality("Trash Talker").await.unwrap();
    let switched = app.game().await;
    assert_eq!(switched.moves, before.moves);
    assert_eq!(switched.analysis, before.analysis);
    assert_eq!(switched.fen, before.fen);

    app.user_move("g1f3").await.unwrap();
    app.buddy_move().await.unwrap();

    let prompts = chat.system_prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], Personality::ChessBuddy.system_prompt());
    assert_eq!(prompts[1], Personality::TrashTalker.system_prompt());
}

#[tokio::test]
async fn test_failed_call_leaves_session_and_save_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let chat = ScriptedChat::new(vec![Some("d5 Solid."), None]);
    let app = assistant(dir.path(), chat);

    app.user_move("d2d4").await.unwrap();
    app.buddy_move().await.unwrap();
    app.save_game("qgd").await.unwrap();
    let saved_path = dir.path().join("saves").join("qgd.json");
    let saved_bytes = std::fs::read(&saved_path).unwrap();

    app.user_move("c2c4").await.unwrap();
    let before = app.game().await;
    let err = app.buddy_move().await.unwrap_err();
    assert!(err.is_upstream());

    let after = app.game().await;
    assert_eq!(after.moves, before.moves);
    assert_eq!(after.analysis, before.analysis);
    assert_eq!(std::fs::read(&saved_path).unwrap(), saved_bytes);
}

#[tokio::test]
async fn test_illegal_model_move_is_shown_but_not_played() {
    let dir = tempfile::tempdir().unwrap();
    let chat = ScriptedChat::new(vec![Some("Qxf7# I win immediately!")]);
    let app = assistant(dir.path(), chat);

    app.user_move("e2e4").await.unwrap();
    let reply = app.buddy_move().await.unwrap();
    assert_eq!(reply.raw, "Qxf7# I win immediately!");
    assert!(reply.chess_move.is_none());
    assert_eq!(app.game().await.moves, vec!["e2e4"]);
}

#[tokio::test]
async fn test_corrupt_save_does_not_replace_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = assistant(dir.path(), ScriptedChat::new(vec![]));
    app.user_move("e2e4").await.unwrap();

    let saves = dir.path().join("saves");
    std::fs::create_dir_all(&saves).unwrap();
    std::fs::write(saves.join("broken.json"), "{\"moves\": 3}").unwrap();
    SavedGame {
        moves: vec!["e2e5".into()],
        analysis: vec![String::new()],
        personality: "Chess Buddy".into(),
    }
    .save(saves.join("illegal.json"))
    .unwrap();

    assert!(app.load_game("broken").await.is_err());
    assert!(app.load_game("illegal").await.is_err());
    assert!(app.load_game("../outside").await.is_err());
    assert_eq!(app.game().await.moves, vec!["e2e4"]);
}

#[tokio::test]
async fn test_new_game_keeps_personality() {
    let dir = tempfile::tempdir().unwrap();
    let app = assistant(dir.path(), ScriptedChat::new(vec![]));
    app.set_personality("grandmaster").await.unwrap();
    app.user_move("e2e4").await.unwrap();

    let fresh = app.new_game().await;
    assert!(fresh.moves.is_empty());
    assert_eq!(fresh.personality, "Grandmaster");
    assert!(app.set_personality("Kibitzer").await.is_err());
}
