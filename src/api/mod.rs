// ==========================================
// Cadet Roster - API layer
// ==========================================
// Responsibility: caller-facing operations over the importer,
// the grade service and the registry; maps errors to ApiError
// ==========================================

pub mod config_api;
pub mod error;
pub mod grade_api;
pub mod import_api;
pub mod roster_api;
pub mod validator;

pub use config_api::{ConfigApi, ConfigItem};
pub use error::{ApiError, ApiResult};
pub use grade_api::{GradeApi, GradeReport};
pub use import_api::ImportApi;
pub use roster_api::RosterApi;
