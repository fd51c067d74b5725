// ==========================================
// Cadet Roster - Application layer
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState, ImportPorts, DB_PATH_ENV};
