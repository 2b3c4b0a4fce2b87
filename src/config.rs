//! Runtime configuration.
//!
//! Values come from a local secrets file of `KEY=VALUE` lines and are
//! overridden by process environment variables of the same name.

use crate::errors::{AssistantError, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SECRETS_FILE: &str = ".env";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_VAR: &str = "MODEL";
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const EMBEDDING_MODEL_VAR: &str = "EMBEDDING_MODEL";
pub const BIND_VAR: &str = "CHESS_ASSISTANT_BIND";
pub const TIMEOUT_VAR: &str = "CHESS_ASSISTANT_TIMEOUT_SECS";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub bind: SocketAddr,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub embeddings_dir: PathBuf,
    pub saves_dir: PathBuf,
}

impl AssistantConfig {
    /// Load from the secrets file (missing file is fine) plus the environment
    pub fn load<P: AsRef<Path>>(secrets_path: P) -> Result<Self> {
        let mut values = read_secrets_file(secrets_path.as_ref())?;
        for key in [
            API_KEY_VAR,
            MODEL_VAR,
            BASE_URL_VAR,
            EMBEDDING_MODEL_VAR,
            BIND_VAR,
            TIMEOUT_VAR,
        ] {
            if let Ok(value) = std::env::var(key) {
                values.insert(key.to_string(), value);
            }
        }
        Self::from_values(&values)
    }

    /// Build from already collected key/value pairs
    pub fn from_values(values: &HashMap<String, String>) -> Result<Self> {
        let api_key = values
            .get(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| crate::config_error!("Please set {} in your .env file", API_KEY_VAR))?;

        let get = |key: &str, default: &str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let bind_str = get(BIND_VAR, DEFAULT_BIND);
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| crate::validation_error!(BIND_VAR, bind_str, "host:port socket address"))?;

        let timeout_str = get(TIMEOUT_VAR, "60");
        let timeout_secs: u64 = timeout_str
            .parse()
            .map_err(|_| crate::validation_error!(TIMEOUT_VAR, timeout_str, "whole seconds"))?;

        Ok(Self {
            api_key,
            base_url: get(BASE_URL_VAR, DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            chat_model: get(MODEL_VAR, DEFAULT_CHAT_MODEL),
            embedding_model: get(EMBEDDING_MODEL_VAR, DEFAULT_EMBEDDING_MODEL),
            bind,
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir: PathBuf::from("data"),
            embeddings_dir: PathBuf::from("embeddings"),
            saves_dir: PathBuf::from("saves"),
        })
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_embeddings_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.embeddings_dir = dir.into();
        self
    }

    pub fn with_saves_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.saves_dir = dir.into();
        self
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }
}

/// Parse a `KEY=VALUE` secrets file. Blank lines and `#` comments are
/// skipped, `export ` prefixes and surrounding quotes are removed.
pub fn parse_secrets(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        values.insert(key.trim().to_string(), value.to_string());
    }
    values
}

fn read_secrets_file(path: &Path) -> Result<HashMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            log::debug!("Loaded secrets from {}", path.display());
            Ok(parse_secrets(&content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No secrets file at {}, using environment only", path.display());
            Ok(HashMap::new())
        }
        Err(e) => Err(AssistantError::IoError(format!(
            "Failed to read secrets file {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_secrets() {
        let parsed = parse_secrets(
            "# comment\nOPENAI_API_KEY=\"sk-test\"\n\nexport MODEL='gpt-4o-mini'\nBROKEN LINE\n",
        );
        assert_eq!(parsed.get("OPENAI_API_KEY").unwrap(), "sk-test");
        assert_eq!(parsed.get("MODEL").unwrap(), "gpt-4o-mini");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::from_values(&values(&[(API_KEY_VAR, "sk-test")])).unwrap();
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.bind, DEFAULT_BIND.parse().unwrap());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_api_key() {
        let err = AssistantConfig::from_values(&values(&[(MODEL_VAR, "gpt-4o")])).unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn test_base_url_trailing_slash_and_bad_bind() {
        let config = AssistantConfig::from_values(&values(&[
            (API_KEY_VAR, "sk-test"),
            (BASE_URL_VAR, "http://localhost:11434/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:11434/v1");

        let err = AssistantConfig::from_values(&values(&[
            (API_KEY_VAR, "sk-test"),
            (BIND_VAR, "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AssistantError::ValidationError { .. }));
    }

    #[test]
    fn test_load_reads_secrets_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.env");
        std::fs::write(&path, "OPENAI_API_KEY=sk-from-file\n").unwrap();
        let config = AssistantConfig::load(&path).unwrap();
        // The environment may override; either way a key is present.
        assert!(!config.api_key.is_empty());
    }
}
