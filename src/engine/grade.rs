// ==========================================
// Cadet Roster - Grade composition engine
// ==========================================
// Pure computation, no I/O:
//   attendance = clamp(present / total * 30, 0, 30)
//   aptitude   = clamp(30 + merit - demerit, 0, 30)
//   subject    = clamp(avg(prelim, midterm, final) * 0.40, 0, 40)
//   final      = attendance + aptitude + subject
// Transmutation uses the unrounded final grade.
// ==========================================

use crate::config::GradingPolicy;
use crate::domain::{AttendanceCounts, ExamScores, GradeSnapshot, LedgerTotals, TransmutedGrade};
use chrono::Utc;

pub const ATTENDANCE_WEIGHT: f64 = 30.0;
pub const APTITUDE_WEIGHT: f64 = 30.0;
pub const SUBJECT_WEIGHT: f64 = 40.0;
/// Aptitude starts full; demerits subtract, merits can only refill it.
pub const APTITUDE_BASELINE: f64 = 30.0;

/// The three facts a grade is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradeInputs {
    pub attendance: AttendanceCounts,
    /// Training days on record; used when the policy denominator is 0.
    pub recorded_days: u32,
    pub ledger: LedgerTotals,
    pub exams: ExamScores,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GradeEngine {
    policy: GradingPolicy,
}

impl GradeEngine {
    pub fn new(policy: GradingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> GradingPolicy {
        self.policy
    }

    pub fn attendance_score(&self, counts: &AttendanceCounts, recorded_days: u32) -> f64 {
        let total = if self.policy.total_training_days > 0 {
            self.policy.total_training_days
        } else {
            recorded_days
        };
        if total == 0 {
            return 0.0;
        }
        let present = f64::from(counts.days_present(self.policy.late_counts_as_present));
        clamp(present / f64::from(total) * ATTENDANCE_WEIGHT, ATTENDANCE_WEIGHT)
    }

    pub fn aptitude_score(&self, ledger: &LedgerTotals) -> f64 {
        clamp(APTITUDE_BASELINE + ledger.net() as f64, APTITUDE_WEIGHT)
    }

    pub fn subject_score(&self, exams: &ExamScores) -> f64 {
        clamp(exams.average() * (SUBJECT_WEIGHT / 100.0), SUBJECT_WEIGHT)
    }

    pub fn compute(&self, cadet_id: &str, inputs: &GradeInputs) -> GradeSnapshot {
        let attendance_score = self.attendance_score(&inputs.attendance, inputs.recorded_days);
        let aptitude_score = self.aptitude_score(&inputs.ledger);
        let subject_score = self.subject_score(&inputs.exams);
        let final_grade = attendance_score + aptitude_score + subject_score;
        let transmuted_grade = TransmutedGrade::from_final_grade(final_grade);

        GradeSnapshot {
            cadet_id: cadet_id.to_string(),
            attendance_score,
            aptitude_score,
            subject_score,
            final_grade,
            transmuted_grade,
            remark: transmuted_grade.remark().to_string(),
            computed_at: Utc::now(),
        }
    }
}

fn clamp(value: f64, upper: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttendanceStatus;

    fn counts(present: u32, late: u32) -> AttendanceCounts {
        let mut c = AttendanceCounts::default();
        c.add(AttendanceStatus::Present, present);
        c.add(AttendanceStatus::Late, late);
        c
    }

    #[test]
    fn test_perfect_record() {
        let engine = GradeEngine::default();
        let snapshot = engine.compute(
            "c1",
            &GradeInputs {
                attendance: counts(15, 0),
                recorded_days: 15,
                ledger: LedgerTotals::default(),
                exams: ExamScores::new(100.0, 100.0, 100.0),
            },
        );
        assert!((snapshot.final_grade - 100.0).abs() < 1e-9);
        assert_eq!(snapshot.transmuted_grade.to_string(), "1.00");
        assert_eq!(snapshot.remark, "Passed");
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let engine = GradeEngine::default();
        let snapshot = engine.compute(
            "c1",
            &GradeInputs {
                attendance: counts(40, 0),
                recorded_days: 15,
                ledger: LedgerTotals {
                    merit_points: 0,
                    demerit_points: 90,
                },
                exams: ExamScores::new(250.0, 300.0, -10.0),
            },
        );
        assert_eq!(snapshot.attendance_score, 30.0);
        assert_eq!(snapshot.aptitude_score, 0.0);
        assert!(snapshot.subject_score <= 40.0 && snapshot.subject_score >= 0.0);
    }

    #[test]
    fn test_merits_cannot_exceed_aptitude_cap() {
        let engine = GradeEngine::default();
        let ledger = LedgerTotals {
            merit_points: 12,
            demerit_points: 5,
        };
        assert_eq!(engine.aptitude_score(&ledger), 30.0);
        let ledger = LedgerTotals {
            merit_points: 2,
            demerit_points: 5,
        };
        assert_eq!(engine.aptitude_score(&ledger), 27.0);
    }

    #[test]
    fn test_late_policy() {
        let strict = GradeEngine::new(GradingPolicy {
            total_training_days: 10,
            late_counts_as_present: false,
        });
        let lenient = GradeEngine::new(GradingPolicy {
            total_training_days: 10,
            late_counts_as_present: true,
        });
        let c = counts(4, 2);
        assert!((strict.attendance_score(&c, 0) - 12.0).abs() < 1e-9);
        assert!((lenient.attendance_score(&c, 0) - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_denominator_falls_back_to_recorded_days() {
        let engine = GradeEngine::new(GradingPolicy {
            total_training_days: 0,
            late_counts_as_present: true,
        });
        assert_eq!(engine.attendance_score(&counts(3, 0), 0), 0.0);
        assert!((engine.attendance_score(&counts(3, 0), 6) - 15.0).abs() < 1e-9);
    }
}
