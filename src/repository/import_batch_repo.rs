// ==========================================
// Cadet Roster - Import batch audit store
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{ImportBatch, PersonKind};
use crate::repository::error::{parse_column, parse_timestamp, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

#[async_trait]
pub trait ImportBatchRepository: Send + Sync {
    async fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()>;

    async fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>>;

    /// Most recent first.
    async fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>>;
}

pub struct ImportBatchRepositoryImpl {
    conn: SharedConnection,
}

const BATCH_COLUMNS: &str = "batch_id, kind, registry, source, total_rows, matched, created, \
                             updated, skipped, errors_json, elapsed_ms, imported_at";

struct BatchRow {
    batch_id: String,
    kind: String,
    registry: String,
    source: String,
    counts: [i64; 5],
    errors_json: String,
    elapsed_ms: i64,
    imported_at: String,
}

impl BatchRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            batch_id: row.get(0)?,
            kind: row.get(1)?,
            registry: row.get(2)?,
            source: row.get(3)?,
            counts: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?],
            errors_json: row.get(9)?,
            elapsed_ms: row.get(10)?,
            imported_at: row.get(11)?,
        })
    }

    fn into_batch(self) -> RepositoryResult<ImportBatch> {
        let [total_rows, matched, created, updated, skipped] = self.counts.map(|n| n.max(0) as usize);
        Ok(ImportBatch {
            registry: parse_column::<PersonKind>("registry", &self.registry)?,
            imported_at: parse_timestamp("imported_at", &self.imported_at)?,
            batch_id: self.batch_id,
            kind: self.kind,
            source: self.source,
            total_rows,
            matched,
            created,
            updated,
            skipped,
            errors_json: self.errors_json,
            elapsed_ms: self.elapsed_ms.max(0) as u64,
        })
    }
}

impl ImportBatchRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ImportBatchRepository for ImportBatchRepositoryImpl {
    async fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, kind, registry, source, total_rows, matched, created,
                updated, skipped, errors_json, elapsed_ms, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.kind,
                batch.registry.as_str(),
                batch.source,
                batch.total_rows as i64,
                batch.matched as i64,
                batch.created as i64,
                batch.updated as i64,
                batch.skipped as i64,
                batch.errors_json,
                batch.elapsed_ms as i64,
                batch.imported_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.conn.lock()?;
        let sql = format!("SELECT {} FROM import_batch WHERE batch_id = ?1", BATCH_COLUMNS);
        let raw = conn
            .query_row(&sql, params![batch_id], BatchRow::from_row)
            .optional()?;
        raw.map(BatchRow::into_batch).transpose()
    }

    async fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT {} FROM import_batch ORDER BY imported_at DESC LIMIT ?1",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], BatchRow::from_row)?;
        let mut batches = Vec::new();
        for row in rows {
            batches.push(row?.into_batch()?);
        }
        Ok(batches)
    }
}
