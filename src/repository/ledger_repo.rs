// ==========================================
// Cadet Roster - Merit / demerit ledger store
// ==========================================
// Entries are append-only; the only mutation is delete.
// Imported entries carry a source_key so re-imports are no-ops.
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{LedgerEntry, LedgerTotals, LedgerType};
use crate::repository::error::{parse_column, parse_timestamp, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn append(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
    ) -> RepositoryResult<LedgerEntry>;

    /// Appends unless an entry with the same source_key exists.
    /// Returns None when the entry was already present.
    async fn append_imported(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
        source_key: &str,
    ) -> RepositoryResult<Option<LedgerEntry>>;

    async fn find_by_id(&self, entry_id: &str) -> RepositoryResult<Option<LedgerEntry>>;

    async fn delete(&self, entry_id: &str) -> RepositoryResult<bool>;

    async fn sum_by_cadet(&self, cadet_id: &str) -> RepositoryResult<LedgerTotals>;

    async fn list_by_cadet(&self, cadet_id: &str) -> RepositoryResult<Vec<LedgerEntry>>;
}

pub struct LedgerRepositoryImpl {
    conn: SharedConnection,
}

type RawEntry = (String, String, String, i64, String, Option<String>, String);

const LEDGER_COLUMNS: &str = "id, cadet_id, entry_type, points, reason, source_key, created_at";

impl LedgerRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RawEntry> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn to_entry(raw: RawEntry) -> RepositoryResult<LedgerEntry> {
        let (id, cadet_id, entry_type, points, reason, source_key, created_at) = raw;
        let points = u32::try_from(points).map_err(|e| RepositoryError::FieldValueError {
            field: "points".to_string(),
            message: e.to_string(),
        })?;
        Ok(LedgerEntry {
            id,
            cadet_id,
            entry_type: parse_column::<LedgerType>("entry_type", &entry_type)?,
            points,
            reason,
            source_key,
            created_at: parse_timestamp("created_at", &created_at)?,
        })
    }

    fn insert(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
        source_key: Option<&str>,
    ) -> RepositoryResult<Option<LedgerEntry>> {
        if points == 0 {
            return Err(RepositoryError::ValidationError(
                "ledger points must be greater than zero".to_string(),
            ));
        }

        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            cadet_id: cadet_id.to_string(),
            entry_type,
            points,
            reason: reason.trim().to_string(),
            source_key: source_key.map(str::to_string),
            created_at: Utc::now(),
        };

        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO ledger_entry
                (id, cadet_id, entry_type, points, reason, source_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.cadet_id,
                entry.entry_type.as_str(),
                entry.points as i64,
                entry.reason,
                entry.source_key,
                entry.created_at.to_rfc3339(),
            ],
        )?;

        Ok((inserted > 0).then_some(entry))
    }
}

#[async_trait]
impl LedgerRepository for LedgerRepositoryImpl {
    async fn append(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
    ) -> RepositoryResult<LedgerEntry> {
        self.insert(cadet_id, entry_type, points, reason, None)?
            .ok_or_else(|| {
                RepositoryError::DatabaseQueryError("ledger entry was not inserted".to_string())
            })
    }

    async fn append_imported(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
        source_key: &str,
    ) -> RepositoryResult<Option<LedgerEntry>> {
        self.insert(cadet_id, entry_type, points, reason, Some(source_key))
    }

    async fn find_by_id(&self, entry_id: &str) -> RepositoryResult<Option<LedgerEntry>> {
        let conn = self.conn.lock()?;
        let sql = format!("SELECT {} FROM ledger_entry WHERE id = ?1", LEDGER_COLUMNS);
        let raw = conn
            .query_row(&sql, params![entry_id], Self::map_row)
            .optional()?;
        raw.map(Self::to_entry).transpose()
    }

    async fn delete(&self, entry_id: &str) -> RepositoryResult<bool> {
        let conn = self.conn.lock()?;
        let affected = conn.execute("DELETE FROM ledger_entry WHERE id = ?1", params![entry_id])?;
        Ok(affected > 0)
    }

    async fn sum_by_cadet(&self, cadet_id: &str) -> RepositoryResult<LedgerTotals> {
        let conn = self.conn.lock()?;
        let (merit, demerit): (i64, i64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_type = 'MERIT' THEN points END), 0),
                COALESCE(SUM(CASE WHEN entry_type = 'DEMERIT' THEN points END), 0)
            FROM ledger_entry WHERE cadet_id = ?1
            "#,
            params![cadet_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(LedgerTotals {
            merit_points: merit,
            demerit_points: demerit,
        })
    }

    async fn list_by_cadet(&self, cadet_id: &str) -> RepositoryResult<Vec<LedgerEntry>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT {} FROM ledger_entry WHERE cadet_id = ?1 ORDER BY created_at, id",
            LEDGER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![cadet_id], Self::map_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(Self::to_entry(row?)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{NameParts, NewPerson, PersonKind};
    use crate::repository::person_repo::{PersonRepositoryImpl, RegistryRepository};

    async fn seed_cadet(conn: &SharedConnection) -> String {
        PersonRepositoryImpl::new(conn.clone())
            .create(NewPerson {
                kind: PersonKind::Cadet,
                external_id: None,
                email: None,
                name: NameParts::new("Ana", "Reyes"),
                unit: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_sum_by_cadet() {
        let conn = open_in_memory().unwrap();
        let cadet_id = seed_cadet(&conn).await;
        let repo = LedgerRepositoryImpl::new(conn);

        repo.append(&cadet_id, LedgerType::Merit, 5, "drill")
            .await
            .unwrap();
        repo.append(&cadet_id, LedgerType::Demerit, 3, "late")
            .await
            .unwrap();
        let totals = repo.sum_by_cadet(&cadet_id).await.unwrap();
        assert_eq!(totals.merit_points, 5);
        assert_eq!(totals.demerit_points, 3);
        assert_eq!(totals.net(), 2);
    }

    #[tokio::test]
    async fn test_zero_points_rejected() {
        let conn = open_in_memory().unwrap();
        let cadet_id = seed_cadet(&conn).await;
        let repo = LedgerRepositoryImpl::new(conn);
        let err = repo.append(&cadet_id, LedgerType::Merit, 0, "nothing").await;
        assert!(matches!(err, Err(RepositoryError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_imported_entry_is_idempotent() {
        let conn = open_in_memory().unwrap();
        let cadet_id = seed_cadet(&conn).await;
        let repo = LedgerRepositoryImpl::new(conn);

        let first = repo
            .append_imported(&cadet_id, LedgerType::Demerit, 2, "uniform", "key-1")
            .await
            .unwrap();
        let second = repo
            .append_imported(&cadet_id, LedgerType::Demerit, 2, "uniform", "key-1")
            .await
            .unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(repo.list_by_cadet(&cadet_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let conn = open_in_memory().unwrap();
        let cadet_id = seed_cadet(&conn).await;
        let repo = LedgerRepositoryImpl::new(conn);
        let entry = repo
            .append(&cadet_id, LedgerType::Merit, 1, "cleanup")
            .await
            .unwrap();
        assert!(repo.delete(&entry.id).await.unwrap());
        assert!(!repo.delete(&entry.id).await.unwrap());
        assert!(repo.find_by_id(&entry.id).await.unwrap().is_none());
    }
}
