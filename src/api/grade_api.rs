// ==========================================
// Cadet Roster - Grade API
// ==========================================
// compute_grade plus the manual fact writes that feed it.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_exam_scores, validate_ledger_input};
use crate::domain::{
    AttendanceRecord, AttendanceStatus, EnrollmentStatus, ExamScores, GradeSnapshot, LedgerEntry,
    LedgerType,
};
use crate::engine::GradeService;
use serde::{Deserialize, Serialize};

/// Snapshot as presented to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    pub snapshot: GradeSnapshot,
    pub enrollment: EnrollmentStatus,
    /// Enrollment flag if set, otherwise the computed remark.
    pub display_remark: String,
}

pub struct GradeApi {
    grades: GradeService,
}

impl GradeApi {
    pub fn new(grades: GradeService) -> Self {
        Self { grades }
    }

    pub async fn compute_grade(&self, cadet_id: &str) -> ApiResult<GradeSnapshot> {
        Ok(self.grades.compute_grade(cadet_id).await?)
    }

    /// Stored snapshot with the display remark; computes one if none exists yet.
    pub async fn get_grade_report(&self, cadet_id: &str) -> ApiResult<GradeReport> {
        let person = self
            .grades
            .repositories()
            .registry
            .find_by_id(cadet_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("person {}", cadet_id)))?;

        let snapshot = match self.grades.get_snapshot(cadet_id).await? {
            Some(snapshot) => snapshot,
            None => self.grades.compute_grade(cadet_id).await?,
        };
        Ok(GradeReport {
            display_remark: snapshot.display_remark(person.enrollment),
            enrollment: person.enrollment,
            snapshot,
        })
    }

    // ==========================================
    // Fact writes (each recomputes before returning)
    // ==========================================

    pub async fn mark_attendance(
        &self,
        person_id: &str,
        day_id: &str,
        status: AttendanceStatus,
        remarks: Option<&str>,
    ) -> ApiResult<Option<GradeSnapshot>> {
        Ok(self
            .grades
            .mark_attendance(person_id, day_id, status, remarks)
            .await?)
    }

    pub async fn attendance_for_person(&self, person_id: &str) -> ApiResult<Vec<AttendanceRecord>> {
        Ok(self
            .grades
            .repositories()
            .attendance
            .list_by_person(person_id)
            .await?)
    }

    pub async fn add_ledger_entry(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
    ) -> ApiResult<(LedgerEntry, GradeSnapshot)> {
        validate_ledger_input(points, reason)?;
        Ok(self
            .grades
            .append_ledger(cadet_id, entry_type, points, reason.trim())
            .await?)
    }

    pub async fn delete_ledger_entry(&self, entry_id: &str) -> ApiResult<()> {
        if self.grades.delete_ledger_entry(entry_id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("ledger entry {}", entry_id)))
        }
    }

    pub async fn list_ledger(&self, cadet_id: &str) -> ApiResult<Vec<LedgerEntry>> {
        Ok(self
            .grades
            .repositories()
            .ledger
            .list_by_cadet(cadet_id)
            .await?)
    }

    pub async fn update_exam_scores(
        &self,
        cadet_id: &str,
        scores: ExamScores,
    ) -> ApiResult<GradeSnapshot> {
        validate_exam_scores(&scores)?;
        Ok(self.grades.update_exam_scores(cadet_id, scores).await?)
    }
}
