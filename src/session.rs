use crate::buddy::{build_move_prompt, parse_reply, BuddyReply};
use crate::errors::{AssistantError, Result};
use crate::llm::{ChatProvider, ChatRequest};
use crate::personality::Personality;
use crate::saved_game::SavedGame;
use chess::{Board, BoardStatus, ChessMove};
use serde::Serialize;
use std::str::FromStr;

/// Snapshot sent to the browser
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub fen: String,
    pub moves: Vec<String>,
    pub analysis: Vec<String>,
    pub personality: String,
    pub status: &'static str,
}

/// In-memory state of one user's game
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    moves: Vec<String>,
    analysis: Vec<String>,
    personality: Personality,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(Personality::default())
    }
}

impl GameSession {
    pub fn new(personality: Personality) -> Self {
        Self {
            board: Board::default(),
            moves: Vec::new(),
            analysis: Vec::new(),
            personality,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn analysis(&self) -> &[String] {
        &self.analysis
    }

    pub fn personality(&self) -> Personality {
        self.personality
    }

    /// Only the prompt persona changes; history is untouched
    pub fn set_personality(&mut self, personality: Personality) {
        self.personality = personality;
    }

    pub fn status(&self) -> &'static str {
        match self.board.status() {
            BoardStatus::Ongoing => "ongoing",
            BoardStatus::Checkmate => "checkmate",
            BoardStatus::Stalemate => "stalemate",
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            fen: self.board.to_string(),
            moves: self.moves.clone(),
            analysis: self.analysis.clone(),
            personality: self.personality.label().to_string(),
            status: self.status(),
        }
    }

    fn play(&mut self, chess_move: ChessMove, analysis: String) {
        self.board = self.board.make_move_new(chess_move);
        self.moves.push(chess_move.to_string());
        self.analysis.push(analysis);
    }

    /// Apply a UCI move from the board widget
    pub fn apply_user_move(&mut self, uci: &str) -> Result<()> {
        if self.board.status() != BoardStatus::Ongoing {
            return Err(crate::invalid_move!("the game is over ({})", self.status()));
        }
        let chess_move = ChessMove::from_str(uci.trim())
            .map_err(|_| crate::invalid_move!("'{}' is not a UCI move", uci))?;
        if !self.board.legal(chess_move) {
            return Err(crate::invalid_move!("{} is not legal in {}", uci, self.board));
        }
        self.play(chess_move, String::new());
        Ok(())
    }

    /// Chat request for the buddy's next move
    pub fn buddy_prompt(&self) -> ChatRequest {
        build_move_prompt(&self.board, &self.moves, self.personality)
    }

    /// Record the buddy's reply. A legal leading move is played with the
    /// reply as its analysis; anything else leaves the game unchanged.
    pub fn apply_buddy_reply(&mut self, reply: &str) -> BuddyReply {
        let parsed = parse_reply(&self.board, reply);
        match parsed.chess_move {
            Some(chess_move) => self.play(chess_move, parsed.raw.clone()),
            None => log::warn!(
                "Model reply did not start with a legal move (token {:?})",
                parsed.move_token
            ),
        }
        parsed
    }

    /// Ask the model for its move. A failed call leaves the session as it was.
    pub async fn request_buddy_move(&mut self, chat: &dyn ChatProvider) -> Result<BuddyReply> {
        if self.board.status() != BoardStatus::Ongoing {
            return Err(crate::invalid_move!("the game is over ({})", self.status()));
        }
        let request = self.buddy_prompt();
        let reply = chat.complete(&request).await?;
        Ok(self.apply_buddy_reply(&reply))
    }

    pub fn to_saved(&self) -> SavedGame {
        SavedGame {
            moves: self.moves.clone(),
            analysis: self.analysis.clone(),
            personality: self.personality.label().to_string(),
        }
    }

    /// Rebuild by replaying the moves from the start position. A short
    /// analysis list is padded with empty entries; a longer one is rejected.
    pub fn from_saved(saved: &SavedGame) -> Result<Self> {
        let personality: Personality = saved.personality.parse()?;
        if saved.analysis.len() > saved.moves.len() {
            return Err(AssistantError::InvalidPosition(format!(
                "{} analysis entries for {} moves",
                saved.analysis.len(),
                saved.moves.len()
            )));
        }
        let mut analysis = saved.analysis.clone();
        analysis.resize(saved.moves.len(), String::new());
        let mut board = Board::default();
        for (ply, uci) in saved.moves.iter().enumerate() {
            let chess_move = ChessMove::from_str(uci)
                .ok()
                .filter(|m| board.legal(*m))
                .ok_or_else(|| {
                    AssistantError::InvalidPosition(format!("move {} ('{}') cannot be replayed", ply + 1, uci))
                })?;
            board = board.make_move_new(chess_move);
        }
        Ok(Self {
            board,
            moves: saved.moves.clone(),
            analysis,
            personality,
        })
    }
}
