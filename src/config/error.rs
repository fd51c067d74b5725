// ==========================================
// Cadet Roster - Configuration errors
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config store lock poisoned: {0}")]
    LockError(String),

    #[error("config store query failed: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid config value: {key}={value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("config snapshot is not valid JSON: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl<T> From<std::sync::PoisonError<T>> for ConfigError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        ConfigError::LockError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
