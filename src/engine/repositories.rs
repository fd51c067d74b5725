// ==========================================
// Cadet Roster - Engine repository bundle
// ==========================================
// Groups the stores the grade service and the importer write through,
// so constructors take one argument instead of seven.
// ==========================================

use crate::db::SharedConnection;
use crate::repository::{
    AttendanceRepository, AttendanceRepositoryImpl, ExamScoreRepository, ExamScoreRepositoryImpl,
    GradeSnapshotRepository, GradeSnapshotRepositoryImpl, ImportBatchRepository,
    ImportBatchRepositoryImpl, LedgerRepository, LedgerRepositoryImpl, PersonRepositoryImpl,
    RegistryRepository, TrainingDayRepository, TrainingDayRepositoryImpl,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct RosterRepositories {
    pub registry: Arc<dyn RegistryRepository>,
    pub training_days: Arc<dyn TrainingDayRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub exam_scores: Arc<dyn ExamScoreRepository>,
    pub snapshots: Arc<dyn GradeSnapshotRepository>,
    pub import_batches: Arc<dyn ImportBatchRepository>,
}

impl RosterRepositories {
    /// All SQLite-backed stores over one shared connection.
    pub fn from_connection(conn: SharedConnection) -> Self {
        Self {
            registry: Arc::new(PersonRepositoryImpl::new(conn.clone())),
            training_days: Arc::new(TrainingDayRepositoryImpl::new(conn.clone())),
            attendance: Arc::new(AttendanceRepositoryImpl::new(conn.clone())),
            ledger: Arc::new(LedgerRepositoryImpl::new(conn.clone())),
            exam_scores: Arc::new(ExamScoreRepositoryImpl::new(conn.clone())),
            snapshots: Arc::new(GradeSnapshotRepositoryImpl::new(conn.clone())),
            import_batches: Arc::new(ImportBatchRepositoryImpl::new(conn)),
        }
    }
}
