// ==========================================
// Cadet Roster - Engine layer
// ==========================================
// Responsibility: grade composition and the write paths that keep
// grade snapshots current
// Rule: engines never build SQL; stores are reached through traits
// ==========================================

pub mod error;
pub mod events;
pub mod grade;
pub mod grade_service;
pub mod key_lock;
pub mod repositories;

pub use error::{GradeError, GradeResult};
pub use events::{BroadcastGradePublisher, GradeEvent, GradeEventPublisher, GradeEventType};
pub use grade::{GradeEngine, GradeInputs};
pub use grade_service::GradeService;
pub use key_lock::{KeyGuard, KeyedLocks};
pub use repositories::RosterRepositories;
