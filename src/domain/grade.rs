// ==========================================
// Cadet Roster - Grade model
// ==========================================
// finalGrade = attendance + aptitude + subject, each clamped first.
// Snapshots are derived data: recomputed, never edited.
// ==========================================

use crate::domain::types::EnrollmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ExamScores
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExamScores {
    pub prelim: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

impl ExamScores {
    pub fn new(prelim: f64, midterm: f64, final_exam: f64) -> Self {
        Self {
            prelim,
            midterm,
            final_exam,
        }
    }

    /// Each score clamped to [0, 100]; NaN becomes 0.
    pub fn clamped(&self) -> Self {
        fn c(v: f64) -> f64 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 100.0)
            }
        }
        Self {
            prelim: c(self.prelim),
            midterm: c(self.midterm),
            final_exam: c(self.final_exam),
        }
    }

    pub fn average(&self) -> f64 {
        let c = self.clamped();
        (c.prelim + c.midterm + c.final_exam) / 3.0
    }
}

// ==========================================
// TransmutedGrade - discrete grade scale
// ==========================================
// Stored in hundredths (100 = 1.00, 500 = 5.00); lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransmutedGrade(u16);

impl TransmutedGrade {
    pub const FAILED: TransmutedGrade = TransmutedGrade(500);

    /// Lower bound of the final grade (inclusive) → transmuted value.
    const TABLE: [(f64, u16); 9] = [
        (98.0, 100),
        (95.0, 125),
        (92.0, 150),
        (89.0, 175),
        (86.0, 200),
        (83.0, 225),
        (80.0, 250),
        (77.0, 275),
        (75.0, 300),
    ];

    /// Total step function over the final grade.
    pub fn from_final_grade(final_grade: f64) -> Self {
        if final_grade.is_nan() {
            return Self::FAILED;
        }
        Self::TABLE
            .iter()
            .find(|(lower, _)| final_grade >= *lower)
            .map(|(_, value)| TransmutedGrade(*value))
            .unwrap_or(Self::FAILED)
    }

    pub fn from_hundredths(value: u16) -> Option<Self> {
        let known = value == 500 || Self::TABLE.iter().any(|(_, v)| *v == value);
        known.then_some(TransmutedGrade(value))
    }

    pub fn hundredths(&self) -> u16 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn is_failing(&self) -> bool {
        *self == Self::FAILED
    }

    pub fn remark(&self) -> &'static str {
        if self.is_failing() {
            "Failed"
        } else {
            "Passed"
        }
    }
}

impl fmt::Display for TransmutedGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ==========================================
// GradeSnapshot
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSnapshot {
    pub cadet_id: String,
    pub attendance_score: f64, // 0..=30
    pub aptitude_score: f64,   // 0..=30
    pub subject_score: f64,    // 0..=40
    pub final_grade: f64,      // 0..=100, unrounded
    pub transmuted_grade: TransmutedGrade,
    pub remark: String,
    pub computed_at: DateTime<Utc>,
}

impl GradeSnapshot {
    /// Remark as shown to users: enrollment flags win over the computed remark.
    pub fn display_remark(&self, enrollment: EnrollmentStatus) -> String {
        enrollment
            .remark_override()
            .map(str::to_string)
            .unwrap_or_else(|| self.remark.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transmuted_display() {
        assert_eq!(TransmutedGrade::from_final_grade(99.0).to_string(), "1.00");
        assert_eq!(TransmutedGrade::from_final_grade(90.0).to_string(), "1.75");
        assert_eq!(TransmutedGrade::from_final_grade(10.0).to_string(), "5.00");
    }

    #[test]
    fn test_from_hundredths_rejects_unknown_values() {
        assert!(TransmutedGrade::from_hundredths(275).is_some());
        assert!(TransmutedGrade::from_hundredths(260).is_none());
    }

    #[test]
    fn test_exam_scores_clamped_before_average() {
        let scores = ExamScores::new(150.0, -20.0, 80.0);
        assert_eq!(scores.clamped(), ExamScores::new(100.0, 0.0, 80.0));
        assert!((scores.average() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_remark_enrollment_override() {
        let snapshot = GradeSnapshot {
            cadet_id: "c1".to_string(),
            attendance_score: 30.0,
            aptitude_score: 30.0,
            subject_score: 40.0,
            final_grade: 100.0,
            transmuted_grade: TransmutedGrade::from_final_grade(100.0),
            remark: "Passed".to_string(),
            computed_at: Utc::now(),
        };
        assert_eq!(snapshot.display_remark(EnrollmentStatus::Active), "Passed");
        assert_eq!(snapshot.display_remark(EnrollmentStatus::Dropped), "Dropped");
        // numeric grade untouched
        assert_eq!(snapshot.transmuted_grade.to_string(), "1.00");
    }
}
