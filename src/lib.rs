// ==========================================
// Cadet Roster - Core library
// ==========================================
// Roster & attendance reconciliation plus composite grade computation.
// Layers: domain → repository → engine / importer → api → app
// ==========================================

// Entities and value types
pub mod domain;

// Data access (SQLite)
pub mod repository;

// Grade composition, per-cadet recompute, events
pub mod engine;

// File/link ingestion and reconciliation
pub mod importer;

// config_kv settings
pub mod config;

// Connection setup and schema
pub mod db;

// Stale-then-refresh registry cache
pub mod cache;

pub mod logging;

// Caller-facing operations
pub mod api;

// Composition root
pub mod app;

pub use domain::{
    AttendanceStatus, EnrollmentStatus, GradeSnapshot, ImportArtifact, ImportRequest,
    ImportResult, LedgerType, Person, PersonKind, TransmutedGrade,
};
pub use engine::{GradeEngine, GradeService};
pub use importer::ImportOrchestrator;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Cadet Roster";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
