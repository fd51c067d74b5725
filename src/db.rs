// ==========================================
// Cadet Roster - SQLite connection & schema
// ==========================================
// Every connection gets the same PRAGMAs: foreign keys on, busy timeout set.
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema version written by [`init_schema`]
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Shared connection handle used by every repository.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Applies the per-connection PRAGMAs.
///
/// foreign_keys and busy_timeout are per connection, not per database.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Opens a connection with the standard configuration.
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Opens, configures and migrates a database, returning a shared handle.
pub fn open_shared(db_path: &str) -> rusqlite::Result<SharedConnection> {
    let conn = open_sqlite_connection(db_path)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database, mostly for tests.
pub fn open_in_memory() -> rusqlite::Result<SharedConnection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Creates all tables (idempotent).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS person (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            external_id TEXT,
            email TEXT,
            email_norm TEXT,
            first_name TEXT NOT NULL,
            middle_name TEXT,
            last_name TEXT NOT NULL,
            suffix TEXT,
            name_key TEXT NOT NULL,
            unit TEXT,
            enrollment TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (kind, external_id),
            UNIQUE (kind, email_norm)
        );
        CREATE INDEX IF NOT EXISTS idx_person_name_key ON person(kind, name_key);

        CREATE TABLE IF NOT EXISTS training_day (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS attendance_record (
            person_id TEXT NOT NULL REFERENCES person(id) ON DELETE CASCADE,
            day_id TEXT NOT NULL REFERENCES training_day(id) ON DELETE CASCADE,
            status TEXT NOT NULL,
            remarks TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (person_id, day_id)
        );
        CREATE INDEX IF NOT EXISTS idx_attendance_day ON attendance_record(day_id);

        CREATE TABLE IF NOT EXISTS ledger_entry (
            id TEXT PRIMARY KEY,
            cadet_id TEXT NOT NULL REFERENCES person(id) ON DELETE CASCADE,
            entry_type TEXT NOT NULL,
            points INTEGER NOT NULL CHECK (points > 0),
            reason TEXT NOT NULL,
            source_key TEXT UNIQUE,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_ledger_cadet ON ledger_entry(cadet_id);

        CREATE TABLE IF NOT EXISTS exam_scores (
            cadet_id TEXT PRIMARY KEY REFERENCES person(id) ON DELETE CASCADE,
            prelim REAL NOT NULL DEFAULT 0,
            midterm REAL NOT NULL DEFAULT 0,
            final_exam REAL NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS grade_snapshot (
            cadet_id TEXT PRIMARY KEY REFERENCES person(id) ON DELETE CASCADE,
            attendance_score REAL NOT NULL,
            aptitude_score REAL NOT NULL,
            subject_score REAL NOT NULL,
            final_grade REAL NOT NULL,
            transmuted_hundredths INTEGER NOT NULL,
            remark TEXT NOT NULL,
            computed_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            registry TEXT NOT NULL,
            source TEXT NOT NULL,
            total_rows INTEGER NOT NULL,
            matched INTEGER NOT NULL,
            created INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            skipped INTEGER NOT NULL,
            errors_json TEXT NOT NULL,
            elapsed_ms INTEGER NOT NULL,
            imported_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Reads schema_version (None when the table is missing).
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
