// ==========================================
// Cadet Roster - Repository layer
// ==========================================
// Rule: no business logic in repositories
// Responsibility: data access behind async traits, SQL kept here
// Constraint: every query is parameterized
// ==========================================

pub mod attendance_repo;
pub mod error;
pub mod grade_repo;
pub mod import_batch_repo;
pub mod ledger_repo;
pub mod person_repo;

pub use attendance_repo::{
    AttendanceRepository, AttendanceRepositoryImpl, TrainingDayRepository,
    TrainingDayRepositoryImpl,
};
pub use error::{RepositoryError, RepositoryResult};
pub use grade_repo::{
    ExamScoreRepository, ExamScoreRepositoryImpl, GradeSnapshotRepository,
    GradeSnapshotRepositoryImpl,
};
pub use import_batch_repo::{ImportBatchRepository, ImportBatchRepositoryImpl};
pub use ledger_repo::{LedgerRepository, LedgerRepositoryImpl};
pub use person_repo::{PersonRepositoryImpl, RegistryRepository};
