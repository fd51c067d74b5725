// ==========================================
// Cadet Roster - API errors
// ==========================================
// Maps layer errors to caller-facing categories; every message
// carries its reason.
// ==========================================

use crate::config::ConfigError;
use crate::engine::GradeError;
use crate::importer::ImportError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Input / business rules
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("business rule violated: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // Import
    // ==========================================
    /// Whole-file rejection; nothing was written.
    #[error("import rejected: {0}")]
    ImportRejected(String),

    #[error("import timed out: {0}")]
    ImportTimeout(String),

    // ==========================================
    // Data access / configuration
    // ==========================================
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    // ==========================================
    // Generic
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("lock unavailable: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("duplicate identifier: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("missing reference: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("bad stored value in {}: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue { .. } => ApiError::InvalidInput(err.to_string()),
            other => ApiError::ConfigError(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => e.into(),
            ImportError::Config(e) => e.into(),
            ImportError::TrainingDayNotFound(day) => {
                ApiError::NotFound(format!("training day {}", day))
            }
            ImportError::CapacityExceeded { .. } => ApiError::BusinessRuleViolation(err.to_string()),
            ImportError::ProcessingTimeout { .. } => ApiError::ImportTimeout(err.to_string()),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportRejected(other.to_string()),
        }
    }
}

impl From<GradeError> for ApiError {
    fn from(err: GradeError) -> Self {
        match err {
            GradeError::PersonNotFound(id) => ApiError::NotFound(format!("person {}", id)),
            GradeError::TrainingDayNotFound(id) => {
                ApiError::NotFound(format!("training day {}", id))
            }
            GradeError::NotACadet(_) => ApiError::BusinessRuleViolation(err.to_string()),
            GradeError::Repository(e) => e.into(),
            GradeError::Config(e) => e.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_file_errors_keep_their_category() {
        let err: ApiError = ImportError::CapacityExceeded {
            current: 499,
            incoming: 2,
            limit: 500,
        }
        .into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

        let err: ApiError = ImportError::UnsupportedFormat("roster.exe".to_string()).into();
        assert!(matches!(err, ApiError::ImportRejected(_)));

        let err: ApiError = ImportError::ProcessingTimeout { seconds: 120 }.into();
        assert!(matches!(err, ApiError::ImportTimeout(_)));
    }

    #[test]
    fn test_repository_errors_map_to_user_categories() {
        let err: ApiError = RepositoryError::UniqueConstraintViolation("person.email".to_string()).into();
        assert!(err.to_string().contains("duplicate identifier"));

        let err: ApiError = GradeError::PersonNotFound("p9".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
