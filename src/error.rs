//! Error types for Pensum.

use thiserror::Error;

/// Library-level error type for Pensum operations.
#[derive(Error, Debug)]
pub enum PensumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Course index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Document ingest failed: {0}")]
    Ingest(String),

    #[error("Unknown tool requested by model: {0}")]
    ToolDispatch(String),

    #[error("Invalid tool arguments: {0}")]
    ToolArgument(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PensumError {
    /// Whether a failed tool execution can be reported back to the model as
    /// text. Malformed arguments are; backend and transport failures abort
    /// the query instead.
    pub fn is_recoverable_in_tool(&self) -> bool {
        matches!(
            self,
            PensumError::ToolArgument(_) | PensumError::InvalidInput(_)
        )
    }
}

/// Result type alias for Pensum operations.
pub type Result<T> = std::result::Result<T, PensumError>;
