// ==========================================
// Cadet Roster - Training day & attendance store
// ==========================================
// Rule: at most one record per (person_id, day_id), enforced by the
// primary key; upsert overwrites status and remarks.
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{AttendanceCounts, AttendanceRecord, AttendanceStatus, TrainingDay};
use crate::repository::error::{parse_column, parse_timestamp, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

#[async_trait]
pub trait TrainingDayRepository: Send + Sync {
    async fn create(
        &self,
        date: NaiveDate,
        title: &str,
        description: Option<&str>,
    ) -> RepositoryResult<TrainingDay>;

    async fn find_by_id(&self, day_id: &str) -> RepositoryResult<Option<TrainingDay>>;

    async fn list(&self) -> RepositoryResult<Vec<TrainingDay>>;

    /// Deletes the day and, via FK cascade, its attendance records.
    /// Returns the persons who had a record on the day.
    async fn delete(&self, day_id: &str) -> RepositoryResult<Vec<String>>;

    async fn count(&self) -> RepositoryResult<usize>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Insert or overwrite the (person, day) record.
    async fn upsert(&self, record: &AttendanceRecord) -> RepositoryResult<()>;

    async fn find(&self, person_id: &str, day_id: &str)
        -> RepositoryResult<Option<AttendanceRecord>>;

    async fn list_by_day(&self, day_id: &str) -> RepositoryResult<Vec<AttendanceRecord>>;

    async fn list_by_person(&self, person_id: &str) -> RepositoryResult<Vec<AttendanceRecord>>;

    async fn count_by_status(&self, person_id: &str) -> RepositoryResult<AttendanceCounts>;
}

// ==========================================
// TrainingDayRepositoryImpl
// ==========================================
pub struct TrainingDayRepositoryImpl {
    conn: SharedConnection,
}

impl TrainingDayRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, Option<String>, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn to_day(
        raw: (String, String, String, Option<String>, String),
    ) -> RepositoryResult<TrainingDay> {
        let (id, date, title, description, created_at) = raw;
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
            RepositoryError::FieldValueError {
                field: "date".to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(TrainingDay {
            id,
            date,
            title,
            description,
            created_at: parse_timestamp("created_at", &created_at)?,
        })
    }
}

#[async_trait]
impl TrainingDayRepository for TrainingDayRepositoryImpl {
    async fn create(
        &self,
        date: NaiveDate,
        title: &str,
        description: Option<&str>,
    ) -> RepositoryResult<TrainingDay> {
        if title.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "training day title is required".to_string(),
            ));
        }
        let day = TrainingDay {
            id: Uuid::new_v4().to_string(),
            date,
            title: title.trim().to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO training_day (id, date, title, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                day.id,
                day.date.format("%Y-%m-%d").to_string(),
                day.title,
                day.description,
                day.created_at.to_rfc3339(),
            ],
        )?;
        Ok(day)
    }

    async fn find_by_id(&self, day_id: &str) -> RepositoryResult<Option<TrainingDay>> {
        let conn = self.conn.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, date, title, description, created_at FROM training_day WHERE id = ?1",
                params![day_id],
                Self::map_row,
            )
            .optional()?;
        raw.map(Self::to_day).transpose()
    }

    async fn list(&self) -> RepositoryResult<Vec<TrainingDay>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, title, description, created_at FROM training_day ORDER BY date, created_at",
        )?;
        let rows = stmt.query_map([], Self::map_row)?;
        let mut days = Vec::new();
        for row in rows {
            days.push(Self::to_day(row?)?);
        }
        Ok(days)
    }

    async fn delete(&self, day_id: &str) -> RepositoryResult<Vec<String>> {
        let mut conn = self.conn.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let affected_persons = {
            let mut stmt =
                tx.prepare("SELECT person_id FROM attendance_record WHERE day_id = ?1")?;
            let rows = stmt.query_map(params![day_id], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let deleted = tx.execute("DELETE FROM training_day WHERE id = ?1", params![day_id])?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TrainingDay".to_string(),
                id: day_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(affected_persons)
    }

    async fn count(&self) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM training_day", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

// ==========================================
// AttendanceRepositoryImpl
// ==========================================
pub struct AttendanceRepositoryImpl {
    conn: SharedConnection,
}

type RawRecord = (String, String, String, Option<String>, String);

impl AttendanceRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn to_record(raw: RawRecord) -> RepositoryResult<AttendanceRecord> {
        let (person_id, day_id, status, remarks, updated_at) = raw;
        Ok(AttendanceRecord {
            person_id,
            day_id,
            status: parse_column::<AttendanceStatus>("status", &status)?,
            remarks,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
        })
    }

    fn query(&self, where_clause: &str, key: &str) -> RepositoryResult<Vec<AttendanceRecord>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "SELECT person_id, day_id, status, remarks, updated_at FROM attendance_record
             WHERE {} ORDER BY day_id, person_id",
            where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![key], Self::map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(Self::to_record(row?)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl AttendanceRepository for AttendanceRepositoryImpl {
    async fn upsert(&self, record: &AttendanceRecord) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO attendance_record (person_id, day_id, status, remarks, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(person_id, day_id) DO UPDATE SET
                status = excluded.status,
                remarks = excluded.remarks,
                updated_at = excluded.updated_at
            "#,
            params![
                record.person_id,
                record.day_id,
                record.status.as_str(),
                record.remarks,
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn find(
        &self,
        person_id: &str,
        day_id: &str,
    ) -> RepositoryResult<Option<AttendanceRecord>> {
        let conn = self.conn.lock()?;
        let raw = conn
            .query_row(
                "SELECT person_id, day_id, status, remarks, updated_at FROM attendance_record
                 WHERE person_id = ?1 AND day_id = ?2",
                params![person_id, day_id],
                Self::map_row,
            )
            .optional()?;
        raw.map(Self::to_record).transpose()
    }

    async fn list_by_day(&self, day_id: &str) -> RepositoryResult<Vec<AttendanceRecord>> {
        self.query("day_id = ?1", day_id)
    }

    async fn list_by_person(&self, person_id: &str) -> RepositoryResult<Vec<AttendanceRecord>> {
        self.query("person_id = ?1", person_id)
    }

    async fn count_by_status(&self, person_id: &str) -> RepositoryResult<AttendanceCounts> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM attendance_record WHERE person_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map(params![person_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = AttendanceCounts::default();
        for row in rows {
            let (status, n) = row?;
            let status = parse_column::<AttendanceStatus>("status", &status)?;
            counts.add(status, n as u32);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{NameParts, NewPerson, PersonKind};
    use crate::repository::person_repo::{PersonRepositoryImpl, RegistryRepository};

    async fn seed() -> (SharedConnection, String, String) {
        let conn = open_in_memory().unwrap();
        let persons = PersonRepositoryImpl::new(conn.clone());
        let person = persons
            .create(NewPerson {
                kind: PersonKind::Cadet,
                external_id: Some("2024-0001".to_string()),
                email: None,
                name: NameParts::new("Juan", "Dela Cruz"),
                unit: None,
            })
            .await
            .unwrap();
        let days = TrainingDayRepositoryImpl::new(conn.clone());
        let day = days
            .create(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(), "Day 1", None)
            .await
            .unwrap();
        (conn, person.id, day.id)
    }

    fn record(person_id: &str, day_id: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            person_id: person_id.to_string(),
            day_id: day_id.to_string(),
            status,
            remarks: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_single_record() {
        let (conn, person_id, day_id) = seed().await;
        let repo = AttendanceRepositoryImpl::new(conn);

        repo.upsert(&record(&person_id, &day_id, AttendanceStatus::Absent))
            .await
            .unwrap();
        repo.upsert(&record(&person_id, &day_id, AttendanceStatus::Present))
            .await
            .unwrap();

        let records = repo.list_by_day(&day_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Present);

        let counts = repo.count_by_status(&person_id).await.unwrap();
        assert_eq!(counts.present, 1);
        assert_eq!(counts.absent, 0);
    }

    #[tokio::test]
    async fn test_delete_day_cascades_records() {
        let (conn, person_id, day_id) = seed().await;
        let repo = AttendanceRepositoryImpl::new(conn.clone());
        let days = TrainingDayRepositoryImpl::new(conn);

        repo.upsert(&record(&person_id, &day_id, AttendanceStatus::Late))
            .await
            .unwrap();

        let affected = days.delete(&day_id).await.unwrap();
        assert_eq!(affected, vec![person_id.clone()]);
        assert!(repo.list_by_person(&person_id).await.unwrap().is_empty());
        assert_eq!(days.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_requires_existing_day() {
        let (conn, person_id, _day_id) = seed().await;
        let repo = AttendanceRepositoryImpl::new(conn);
        let err = repo
            .upsert(&record(&person_id, "missing-day", AttendanceStatus::Present))
            .await;
        assert!(matches!(err, Err(RepositoryError::ForeignKeyViolation(_))));
    }
}
