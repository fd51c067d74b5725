// ==========================================
// Cadet Roster - Import errors
// ==========================================
// ImportError: whole-file failures, raised before any write
// Per-row failures are data (RowError), never raised
// Tool: thiserror derive
// ==========================================

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// Whole-file import failure
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== Input =====
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot resolve link to a downloadable file: {0}")]
    UnresolvableLink(String),

    #[error("file read failed: {0}")]
    FileReadError(String),

    #[error("Excel parse failed: {0}")]
    ExcelParseError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    #[error("document parse failed: {0}")]
    DocumentParseError(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(#[from] ExtractionError),

    // ===== Limits =====
    #[error("processing exceeded {seconds}s")]
    ProcessingTimeout { seconds: u64 },

    #[error("roster capacity exceeded: {current} existing + {incoming} new > limit {limit}")]
    CapacityExceeded {
        current: usize,
        incoming: usize,
        limit: usize,
    },

    // ===== Target =====
    #[error("training day not found: {0}")]
    TrainingDayNotFound(String),

    // ===== Collaborators =====
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of the text-extraction port (document text layer or OCR)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("text extraction is not available for {0}")]
    Unavailable(String),

    #[error("extractor failed: {0}")]
    Failed(String),

    #[error("no text found")]
    Empty,
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::UnresolvableLink(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::InternalError(format!("parser task failed: {}", err))
    }
}

/// Result alias
pub type ImporterResult<T> = Result<T, ImportError>;
