// ==========================================
// Cadet Roster - Domain layer
// ==========================================
// Responsibility: entities, value types, enums
// No data access, no engine logic
// ==========================================

pub mod attendance;
pub mod grade;
pub mod import;
pub mod ledger;
pub mod normalize;
pub mod person;
pub mod types;

pub use attendance::{AttendanceCounts, AttendanceRecord, TrainingDay};
pub use grade::{ExamScores, GradeSnapshot, TransmutedGrade};
pub use import::{
    Blob, Candidate, GeneratedId, ImportArtifact, ImportBatch, ImportKind, ImportRequest,
    ImportResult, LedgerLine, RowError, RowErrorKind,
};
pub use ledger::{LedgerEntry, LedgerTotals};
pub use person::{NameParts, NewPerson, Person, PersonPatch};
pub use types::{AttendanceStatus, EnrollmentStatus, LedgerType, PersonKind};
