// ==========================================
// Cadet Roster - Exam scores & grade snapshot store
// ==========================================
// One exam_scores row and at most one grade_snapshot row per cadet.
// ==========================================

use crate::db::SharedConnection;
use crate::domain::{ExamScores, GradeSnapshot, TransmutedGrade};
use crate::repository::error::{parse_timestamp, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

#[async_trait]
pub trait ExamScoreRepository: Send + Sync {
    /// Missing row reads as all-zero scores.
    async fn get(&self, cadet_id: &str) -> RepositoryResult<ExamScores>;

    async fn upsert(&self, cadet_id: &str, scores: &ExamScores) -> RepositoryResult<()>;
}

#[async_trait]
pub trait GradeSnapshotRepository: Send + Sync {
    async fn save(&self, snapshot: &GradeSnapshot) -> RepositoryResult<()>;

    async fn find(&self, cadet_id: &str) -> RepositoryResult<Option<GradeSnapshot>>;
}

// ==========================================
// ExamScoreRepositoryImpl
// ==========================================
pub struct ExamScoreRepositoryImpl {
    conn: SharedConnection,
}

impl ExamScoreRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ExamScoreRepository for ExamScoreRepositoryImpl {
    async fn get(&self, cadet_id: &str) -> RepositoryResult<ExamScores> {
        let conn = self.conn.lock()?;
        let scores = conn
            .query_row(
                "SELECT prelim, midterm, final_exam FROM exam_scores WHERE cadet_id = ?1",
                params![cadet_id],
                |row| Ok(ExamScores::new(row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(scores.unwrap_or_default())
    }

    async fn upsert(&self, cadet_id: &str, scores: &ExamScores) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO exam_scores (cadet_id, prelim, midterm, final_exam, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(cadet_id) DO UPDATE SET
                prelim = excluded.prelim,
                midterm = excluded.midterm,
                final_exam = excluded.final_exam,
                updated_at = excluded.updated_at
            "#,
            params![
                cadet_id,
                scores.prelim,
                scores.midterm,
                scores.final_exam,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ==========================================
// GradeSnapshotRepositoryImpl
// ==========================================
pub struct GradeSnapshotRepositoryImpl {
    conn: SharedConnection,
}

impl GradeSnapshotRepositoryImpl {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl GradeSnapshotRepository for GradeSnapshotRepositoryImpl {
    async fn save(&self, snapshot: &GradeSnapshot) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO grade_snapshot (
                cadet_id, attendance_score, aptitude_score, subject_score,
                final_grade, transmuted_hundredths, remark, computed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(cadet_id) DO UPDATE SET
                attendance_score = excluded.attendance_score,
                aptitude_score = excluded.aptitude_score,
                subject_score = excluded.subject_score,
                final_grade = excluded.final_grade,
                transmuted_hundredths = excluded.transmuted_hundredths,
                remark = excluded.remark,
                computed_at = excluded.computed_at
            "#,
            params![
                snapshot.cadet_id,
                snapshot.attendance_score,
                snapshot.aptitude_score,
                snapshot.subject_score,
                snapshot.final_grade,
                snapshot.transmuted_grade.hundredths() as i64,
                snapshot.remark,
                snapshot.computed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn find(&self, cadet_id: &str) -> RepositoryResult<Option<GradeSnapshot>> {
        let conn = self.conn.lock()?;
        let raw = conn
            .query_row(
                "SELECT cadet_id, attendance_score, aptitude_score, subject_score, final_grade,
                        transmuted_hundredths, remark, computed_at
                 FROM grade_snapshot WHERE cadet_id = ?1",
                params![cadet_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((cadet_id, attendance, aptitude, subject, final_grade, hundredths, remark, at)) =
            raw
        else {
            return Ok(None);
        };

        let transmuted_grade = u16::try_from(hundredths)
            .ok()
            .and_then(TransmutedGrade::from_hundredths)
            .ok_or_else(|| RepositoryError::FieldValueError {
                field: "transmuted_hundredths".to_string(),
                message: format!("not a transmutation table value: {}", hundredths),
            })?;

        Ok(Some(GradeSnapshot {
            cadet_id,
            attendance_score: attendance,
            aptitude_score: aptitude,
            subject_score: subject,
            final_grade,
            transmuted_grade,
            remark,
            computed_at: parse_timestamp("computed_at", &at)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{NameParts, NewPerson, PersonKind};
    use crate::repository::person_repo::{PersonRepositoryImpl, RegistryRepository};

    #[tokio::test]
    async fn test_exam_scores_default_and_upsert() {
        let conn = open_in_memory().unwrap();
        let cadet = PersonRepositoryImpl::new(conn.clone())
            .create(NewPerson {
                kind: PersonKind::Cadet,
                external_id: None,
                email: None,
                name: NameParts::new("Ana", "Reyes"),
                unit: None,
            })
            .await
            .unwrap();
        let repo = ExamScoreRepositoryImpl::new(conn);

        assert_eq!(repo.get(&cadet.id).await.unwrap(), ExamScores::default());
        repo.upsert(&cadet.id, &ExamScores::new(80.0, 90.0, 100.0))
            .await
            .unwrap();
        assert_eq!(
            repo.get(&cadet.id).await.unwrap(),
            ExamScores::new(80.0, 90.0, 100.0)
        );
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let conn = open_in_memory().unwrap();
        let cadet = PersonRepositoryImpl::new(conn.clone())
            .create(NewPerson {
                kind: PersonKind::Cadet,
                external_id: None,
                email: None,
                name: NameParts::new("Ana", "Reyes"),
                unit: None,
            })
            .await
            .unwrap();
        let repo = GradeSnapshotRepositoryImpl::new(conn);
        let transmuted = TransmutedGrade::from_final_grade(91.0);
        let snapshot = GradeSnapshot {
            cadet_id: cadet.id.clone(),
            attendance_score: 30.0,
            aptitude_score: 25.0,
            subject_score: 36.0,
            final_grade: 91.0,
            transmuted_grade: transmuted,
            remark: transmuted.remark().to_string(),
            computed_at: Utc::now(),
        };
        repo.save(&snapshot).await.unwrap();

        let stored = repo.find(&cadet.id).await.unwrap().unwrap();
        assert_eq!(stored.transmuted_grade.to_string(), "1.75");
        assert_eq!(stored.remark, "Passed");
    }
}
