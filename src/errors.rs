use std::fmt;

/// Error types for the chess assistant
#[derive(Debug, Clone)]
pub enum AssistantError {
    /// Move could not be parsed or applied to the current board
    InvalidMove(String),
    /// Board state could not be reconstructed
    InvalidPosition(String),
    /// Index database operation failed
    DatabaseError(String),
    /// Vector operation failed (dimension mismatch, empty embedding)
    VectorError(String),
    /// PGN input could not be read
    PgnError(String),
    /// File I/O operation failed
    IoError(String),
    /// A file or directory that should exist does not
    NotFound(String),
    /// JSON or binary serialization failed
    SerializationError(String),
    /// Configuration error (missing API key, bad bind address)
    ConfigurationError(String),
    /// Transport-level HTTP failure or non-success status
    HttpError {
        status: Option<u16>,
        message: String,
    },
    /// The hosted API answered but the payload was unusable
    ApiError(String),
    /// No index is available to search
    IndexNotFound(String),
    /// Unknown personality label
    UnknownPersonality(String),
    /// Operation failed after maximum retries
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },
    /// Validation error with context
    ValidationError {
        field: String,
        value: String,
        expected: String,
    },
    /// Chained error with context
    ChainedError {
        source: Box<AssistantError>,
        context: String,
    },
}

impl fmt::Display for AssistantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantError::InvalidMove(msg) => write!(f, "Invalid move: {}", msg),
            AssistantError::InvalidPosition(msg) => write!(f, "Invalid position: {}", msg),
            AssistantError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AssistantError::VectorError(msg) => write!(f, "Vector operation error: {}", msg),
            AssistantError::PgnError(msg) => write!(f, "PGN error: {}", msg),
            AssistantError::IoError(msg) => write!(f, "I/O error: {}", msg),
            AssistantError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AssistantError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AssistantError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AssistantError::HttpError { status: Some(code), message } => {
                write!(f, "HTTP {}: {}", code, message)
            }
            AssistantError::HttpError { status: None, message } => {
                write!(f, "HTTP request failed: {}", message)
            }
            AssistantError::ApiError(msg) => write!(f, "API error: {}", msg),
            AssistantError::IndexNotFound(msg) => write!(f, "{}", msg),
            AssistantError::UnknownPersonality(label) => {
                write!(f, "Unknown personality: {}", label)
            }
            AssistantError::RetryExhausted { operation, attempts, last_error } => {
                write!(f, "Operation '{}' failed after {} attempts: {}", operation, attempts, last_error)
            }
            AssistantError::ValidationError { field, value, expected } => {
                write!(f, "Validation failed for field '{}': got '{}', expected '{}'", field, value, expected)
            }
            AssistantError::ChainedError { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AssistantError {}

impl AssistantError {
    /// True for failures of the outbound call itself (network, status, payload)
    pub fn is_upstream(&self) -> bool {
        match self {
            AssistantError::HttpError { .. }
            | AssistantError::ApiError(_)
            | AssistantError::RetryExhausted { .. } => true,
            AssistantError::ChainedError { source, .. } => source.is_upstream(),
            _ => false,
        }
    }
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, AssistantError>;

impl From<std::io::Error> for AssistantError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => AssistantError::NotFound(error.to_string()),
            _ => AssistantError::IoError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(error: serde_json::Error) -> Self {
        AssistantError::SerializationError(format!("JSON serialization error: {}", error))
    }
}

impl From<bincode::Error> for AssistantError {
    fn from(error: bincode::Error) -> Self {
        AssistantError::SerializationError(format!("Binary serialization error: {}", error))
    }
}

impl From<rusqlite::Error> for AssistantError {
    fn from(error: rusqlite::Error) -> Self {
        AssistantError::DatabaseError(error.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(error: reqwest::Error) -> Self {
        AssistantError::HttpError {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

/// Retry helpers for batch work against the hosted API
pub mod resilience {
    use super::*;
    use std::future::Future;
    use std::time::Duration;

    /// Configuration for retry operations
    #[derive(Debug, Clone)]
    pub struct RetryConfig {
        pub max_attempts: u32,
        pub initial_delay_ms: u64,
        pub max_delay_ms: u64,
        pub backoff_multiplier: f64,
    }

    impl Default for RetryConfig {
        fn default() -> Self {
            Self {
                max_attempts: 3,
                initial_delay_ms: 500,
                max_delay_ms: 10_000,
                backoff_multiplier: 2.0,
            }
        }
    }

    impl RetryConfig {
        /// Single attempt, no backoff
        pub fn no_retry() -> Self {
            Self {
                max_attempts: 1,
                ..Self::default()
            }
        }
    }

    /// Retry an async operation with exponential backoff
    pub async fn retry_with_backoff<T, F, Fut>(
        operation_name: &str,
        config: &RetryConfig,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<AssistantError> = None;
        let mut delay_ms = config.initial_delay_ms;
        let attempts = config.max_attempts.max(1);

        for attempt in 1..=attempts {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    log::warn!("{} attempt {}/{} failed: {}", operation_name, attempt, attempts, error);
                    last_error = Some(error);

                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = ((delay_ms as f64) * config.backoff_multiplier) as u64;
                        delay_ms = delay_ms.min(config.max_delay_ms);
                    }
                }
            }
        }

        match last_error {
            Some(error) if attempts == 1 => Err(error),
            last_error => Err(AssistantError::RetryExhausted {
                operation: operation_name.to_string(),
                attempts,
                last_error: last_error.map(|e| e.to_string()).unwrap_or("unknown".to_string()),
            }),
        }
    }
}

// Helper macros for error creation
#[macro_export]
macro_rules! invalid_move {
    ($msg:expr) => {
        $crate::errors::AssistantError::InvalidMove($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AssistantError::InvalidMove(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! vector_error {
    ($msg:expr) => {
        $crate::errors::AssistantError::VectorError($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AssistantError::VectorError(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::errors::AssistantError::ConfigurationError($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AssistantError::ConfigurationError(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! api_error {
    ($msg:expr) => {
        $crate::errors::AssistantError::ApiError($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::errors::AssistantError::ApiError(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($field:expr, $value:expr, $expected:expr) => {
        $crate::errors::AssistantError::ValidationError {
            field: $field.to_string(),
            value: $value.to_string(),
            expected: $expected.to_string(),
        }
    };
}

#[macro_export]
macro_rules! add_context {
    ($result:expr, $context:expr) => {
        $result.map_err(|e| $crate::errors::AssistantError::ChainedError {
            source: Box::new(e),
            context: $context.to_string(),
        })
    };
}
