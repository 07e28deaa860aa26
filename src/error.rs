use crate::analyzer::FileCategory;
use crate::llm::LlmError;
use thiserror::Error;

/// Main error type for the finadvisor library.
#[derive(Error, Debug)]
pub enum Error {
    /// Extension maps to no analyzer; rejected before any file I/O
    #[error("unsupported file type: .{0}")]
    UnsupportedFormat(String),

    /// Format-specific extraction failed (corrupt file, parser error, OCR failure)
    #[error("error analyzing {category} file: {message}")]
    Analysis {
        category: FileCategory,
        message: String,
    },

    /// Language-model call failed, for detection or advice
    #[error("advice generation failed: {0}")]
    AdviceGeneration(#[from] LlmError),

    /// Referenced conversation does not exist or is not owned by the caller
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    /// Required credential or setting absent at startup
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Upload exceeds the ingestion size limit
    #[error("file size {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// Another request modified the conversation since it was read
    #[error("conversation modified concurrently: {0}")]
    ConversationConflict(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status class a front door should surface for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::UnsupportedFormat(_) | Error::Analysis { .. } | Error::AdviceGeneration(_) => {
                400
            }
            Error::ConversationNotFound(_) => 404,
            Error::ConversationConflict(_) => 409,
            Error::FileTooLarge { .. } => 413,
            Error::Configuration(_) | Error::Database(_) | Error::Io(_) | Error::Json(_) => 500,
        }
    }
}

/// Result type alias for the finadvisor library.
pub type Result<T> = std::result::Result<T, Error>;
