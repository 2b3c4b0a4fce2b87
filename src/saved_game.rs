use crate::errors::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A game persisted as one JSON document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedGame {
    /// Moves in play order, UCI notation
    pub moves: Vec<String>,
    /// Free-text analysis per move
    pub analysis: Vec<String>,
    /// Personality label
    pub personality: String,
}

impl SavedGame {
    /// Write the whole document through a uniquely named temp file in the
    /// same directory, renamed over `path` once complete.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::Builder::new().suffix(".tmp").tempfile_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| AssistantError::from(e.error))?;
        log::info!("Saved game with {} moves to {}", self.moves.len(), path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AssistantError::SerializationError(format!("Malformed save file {}: {}", path.display(), e))
        })
    }
}

/// Resolve a user-supplied save name inside `dir`. Names are plain file
/// stems: no separators, no parent references.
pub fn save_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let name = name.trim();
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let valid = !stem.is_empty()
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.'));
    if !valid {
        return Err(crate::validation_error!(
            "save name",
            name,
            "letters, digits, '-', '_', ' ' or '.'"
        ));
    }
    Ok(dir.join(format!("{}.json", stem)))
}

/// Save names (without extension) in `dir`, sorted
pub fn list_saves(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.strip_suffix(".json").map(|s| s.to_string())
        })
        .collect();
    names.sort();
    Ok(names)
}
