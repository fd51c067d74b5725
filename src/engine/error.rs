// ==========================================
// Cadet Roster - Engine errors
// ==========================================

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradeError {
    #[error("person not found: {0}")]
    PersonNotFound(String),

    #[error("{0} is not a cadet; grades apply to cadets only")]
    NotACadet(String),

    #[error("training day not found: {0}")]
    TrainingDayNotFound(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

pub type GradeResult<T> = Result<T, GradeError>;
