use crate::errors::{AssistantError, Result};
use chess::{Board, ChessMove};
use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Headers copied into the game description, in order
pub const DESCRIPTION_HEADERS: [&str; 7] = ["Event", "Site", "Date", "White", "Black", "Result", "ECO"];

/// One game rendered as searchable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDocument {
    pub description: String,
    pub source: String,
}

/// Headers and UCI main line of a parsed game
#[derive(Debug, Clone, Default)]
pub struct GameRecord {
    pub headers: HashMap<String, String>,
    pub moves: Vec<String>,
}

impl GameRecord {
    pub fn header(&self, key: &str) -> &str {
        self.headers.get(key).map(|s| s.as_str()).unwrap_or("Unknown")
    }

    /// `Event: .. Site: .. Date: .. White: .. Black: .. Result: .. ECO: .. Moves: ..`
    pub fn description(&self) -> String {
        let mut parts: Vec<String> = DESCRIPTION_HEADERS
            .iter()
            .map(|key| format!("{}: {}", key, self.header(key)))
            .collect();
        parts.push(format!("Moves: {}", self.moves.join(" ")));
        parts.join(" ")
    }
}

/// Decode a header value as UTF-8, falling back to Latin-1
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// PGN visitor that keeps headers and converts the main line to UCI
pub struct GameSummaryExtractor {
    record: GameRecord,
    board: Board,
    line_broken: bool,
}

impl GameSummaryExtractor {
    pub fn new() -> Self {
        Self {
            record: GameRecord::default(),
            board: Board::default(),
            line_broken: false,
        }
    }
}

impl Default for GameSummaryExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for GameSummaryExtractor {
    type Result = GameRecord;

    fn begin_game(&mut self) {
        self.record = GameRecord::default();
        self.board = Board::default();
        self.line_broken = false;
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        let key = decode_header_bytes(key);
        let value = decode_header_bytes(&value.decode());
        self.record.headers.insert(key, value);
    }

    fn end_headers(&mut self) -> Skip {
        if let Some(fen) = self.record.headers.get("FEN") {
            match Board::from_str(fen) {
                Ok(board) => self.board = board,
                Err(_) => {
                    log::debug!("Unreadable FEN header '{}', skipping moves", fen);
                    self.line_broken = true;
                }
            }
        }
        Skip(false)
    }

    fn san(&mut self, san_plus: SanPlus) {
        if self.line_broken {
            return;
        }

        let san_str = san_plus.san.to_string();
        match ChessMove::from_san(&self.board, &san_str) {
            Ok(chess_move) if self.board.legal(chess_move) => {
                self.board = self.board.make_move_new(chess_move);
                self.record.moves.push(chess_move.to_string());
            }
            _ => {
                // Everything after an unreadable move would be on the wrong board
                log::debug!("Stopping main line at unparseable move '{}'", san_str);
                self.line_broken = true;
            }
        }
    }

    fn begin_variation(&mut self) -> Skip {
        Skip(true)
    }

    fn end_game(&mut self) -> Self::Result {
        std::mem::take(&mut self.record)
    }
}

/// Parse every game in a PGN byte buffer
pub fn parse_games(bytes: &[u8]) -> Result<Vec<GameRecord>> {
    let mut reader = BufferedReader::new(std::io::Cursor::new(bytes));
    let mut extractor = GameSummaryExtractor::new();
    let mut games = Vec::new();

    while let Some(record) = reader
        .read_game(&mut extractor)
        .map_err(|e| AssistantError::PgnError(e.to_string()))?
    {
        if record.headers.is_empty() && record.moves.is_empty() {
            continue;
        }
        games.push(record);
        if games.len() % 100 == 0 {
            log::debug!("Parsed {} games", games.len());
        }
    }
    Ok(games)
}

/// Parse one PGN file into game documents tagged with the file name
pub fn load_pgn_file<P: AsRef<Path>>(path: P) -> Result<Vec<GameDocument>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let games = parse_games(&bytes)?;
    log::info!("Successfully processed {} games from {}", games.len(), path.display());

    Ok(games
        .iter()
        .map(|game| GameDocument {
            description: game.description(),
            source: source.clone(),
        })
        .collect())
}

/// `*.pgn` files directly inside `dir`, sorted by name
pub fn find_pgn_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pgn"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load all PGN files of a directory in parallel. Files that fail to read
/// are logged and skipped.
pub fn load_pgn_files<P: AsRef<Path>>(dir: P) -> Result<Vec<GameDocument>> {
    let files = find_pgn_files(dir)?;
    log::info!("Found {} PGN files", files.len());

    let per_file: Vec<Vec<GameDocument>> = files
        .par_iter()
        .map(|file| match load_pgn_file(file) {
            Ok(docs) => docs,
            Err(e) => {
                log::warn!("Failed to read {}: {}", file.display(), e);
                Vec::new()
            }
        })
        .collect();

    let documents: Vec<GameDocument> = per_file.into_iter().flatten().collect();
    log::info!("Total documents created: {}", documents.len());
    Ok(documents)
}
