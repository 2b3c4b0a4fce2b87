//! Prompt construction for the chess buddy and parsing of its replies.
//!
//! The model's reply is kept verbatim as analysis. Its leading token is
//! tried as a move (SAN first, then UCI) against the current board; only a
//! legal move is reported as playable.

use crate::llm::{ChatMessage, ChatRequest};
use crate::personality::Personality;
use chess::{Board, ChessMove, Color};
use serde::Serialize;
use std::str::FromStr;

pub const BUDDY_TEMPERATURE: f32 = 0.7;

/// What the model said and the move it led with, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuddyReply {
    pub raw: String,
    pub move_token: Option<String>,
    #[serde(serialize_with = "serialize_move")]
    pub chess_move: Option<ChessMove>,
    pub commentary: String,
}

fn serialize_move<S: serde::Serializer>(m: &Option<ChessMove>, s: S) -> Result<S::Ok, S::Error> {
    match m {
        Some(m) => s.serialize_some(&m.to_string()),
        None => s.serialize_none(),
    }
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Fixed instruction template around the board state
pub fn move_prompt(board: &Board, moves: &[String]) -> String {
    let history = if moves.is_empty() {
        "none yet".to_string()
    } else {
        moves.join(" ")
    };
    format!(
        "We are playing a game of chess and it is your turn. You play {side}.\n\
         Current position (FEN): {fen}\n\
         Moves so far (UCI): {history}\n\n\
         Start your reply with your move in standard algebraic notation as the very first word, \
         then explain your move.",
        side = color_name(board.side_to_move()),
        fen = board,
        history = history,
    )
}

/// System message from the personality, user message from the template
pub fn build_move_prompt(board: &Board, moves: &[String], personality: Personality) -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system(personality.system_prompt()),
        ChatMessage::user(move_prompt(board, moves)),
    ])
    .with_temperature(BUDDY_TEMPERATURE)
}

/// Strip markdown, quotes, move numbers and annotation glyphs around a token
fn clean_token(token: &str) -> &str {
    let token = token.trim_matches(|c: char| matches!(c, '*' | '`' | '"' | '\'' | '(' | ')' | '[' | ']' | ',' | ';' | ':'));
    // "12." / "12...Nf6" / "1.e4"
    let token = if token.starts_with(|c: char| c.is_ascii_digit()) && token.contains('.') {
        token.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
    } else {
        token.trim_start_matches('.')
    };
    token.trim_end_matches(|c: char| matches!(c, '!' | '?' | '.'))
}

/// Try a token as SAN, then as UCI; return it only if legal on `board`
pub fn parse_move_token(board: &Board, token: &str) -> Option<ChessMove> {
    let trimmed = token.trim_end_matches(['+', '#']);
    let san = if trimmed.starts_with("0-0") {
        trimmed.replace('0', "O")
    } else {
        trimmed.to_string()
    };

    ChessMove::from_san(board, &san)
        .ok()
        .filter(|m| board.legal(*m))
        .or_else(|| {
            ChessMove::from_str(&trimmed.to_ascii_lowercase())
                .ok()
                .filter(|m| board.legal(*m))
        })
}

/// Split a reply into its leading move token and the rest
pub fn parse_reply(board: &Board, reply: &str) -> BuddyReply {
    let mut move_token = None;
    let mut commentary_start = 0;

    for raw_token in reply.split_whitespace() {
        let offset = raw_token.as_ptr() as usize - reply.as_ptr() as usize;
        let token = clean_token(raw_token);
        if token.is_empty() {
            continue;
        }
        move_token = Some(token.to_string());
        commentary_start = offset + raw_token.len();
        break;
    }

    let chess_move = move_token.as_deref().and_then(|t| parse_move_token(board, t));
    let commentary = if chess_move.is_some() {
        reply[commentary_start..]
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '.' | ',' | '*'))
            .trim_end()
            .to_string()
    } else {
        reply.trim().to_string()
    };

    BuddyReply {
        raw: reply.to_string(),
        move_token,
        chess_move,
        commentary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn after(moves: &[&str]) -> Board {
        moves.iter().fold(Board::default(), |board, m| {
            board.make_move_new(ChessMove::from_str(m).unwrap())
        })
    }

    #[test]
    fn test_prompt_contains_board_state() {
        let board = after(&["e2e4"]);
        let request = build_move_prompt(&board, &["e2e4".to_string()], Personality::Coach);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.system_prompt(), Some(Personality::Coach.system_prompt()));

        let user = &request.messages[1].content;
        assert!(user.contains("You play Black"));
        assert!(user.contains(&board.to_string()));
        assert!(user.contains("Moves so far (UCI): e2e4"));
    }

    #[test]
    fn test_prompt_for_new_game() {
        let prompt = move_prompt(&Board::default(), &[]);
        assert!(prompt.contains("You play White"));
        assert!(prompt.contains("none yet"));
    }

    #[test]
    fn test_parse_san_reply() {
        let board = after(&["e2e4"]);
        let reply = parse_reply(&board, "**e5!** Meeting you in the center, no pawn intended.");
        assert_eq!(reply.move_token.as_deref(), Some("e5"));
        assert_eq!(reply.chess_move.unwrap().to_string(), "e7e5");
        assert_eq!(reply.commentary, "Meeting you in the center, no pawn intended.");
        assert!(reply.raw.starts_with("**e5!**"));
    }

    #[test]
    fn test_parse_numbered_and_uci_replies() {
        let board = after(&["e2e4", "e7e5"]);
        let reply = parse_reply(&board, "2. Nf3 - attacking your pawn.");
        assert_eq!(reply.chess_move.unwrap().to_string(), "g1f3");

        let reply = parse_reply(&board, "2.Nf3 attacking");
        assert_eq!(reply.chess_move.unwrap().to_string(), "g1f3");

        let reply = parse_reply(&board, "g1f3\nKnight out.");
        assert_eq!(reply.chess_move.unwrap().to_string(), "g1f3");
        assert_eq!(reply.commentary, "Knight out.");
    }

    #[test]
    fn test_parse_castling() {
        let board = after(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"]);
        let reply = parse_reply(&board, "O-O, tucking my king away.");
        assert_eq!(reply.chess_move.unwrap().to_string(), "e1g1");

        let reply = parse_reply(&board, "0-0 safety first");
        assert_eq!(reply.chess_move.unwrap().to_string(), "e1g1");
    }

    #[test]
    fn test_illegal_or_missing_move() {
        let board = Board::default();
        let reply = parse_reply(&board, "Qh5 is my favourite opening!");
        assert_eq!(reply.move_token.as_deref(), Some("Qh5"));
        assert!(reply.chess_move.is_none());
        assert_eq!(reply.commentary, "Qh5 is my favourite opening!");

        let reply = parse_reply(&board, "   ");
        assert!(reply.move_token.is_none());
        assert!(reply.chess_move.is_none());
    }
}
