// ==========================================
// Grade engine integration tests
// ==========================================
// Transmutation boundaries, component clamps and recompute-on-write
// through the public APIs.
// ==========================================

mod test_helpers;

use cadet_roster::config::{config_keys, GradingPolicy};
use cadet_roster::domain::{
    AttendanceCounts, AttendanceStatus, ExamScores, LedgerTotals, LedgerType, PersonKind,
    TransmutedGrade,
};
use cadet_roster::engine::{GradeEngine, GradeEventType, GradeInputs};
use cadet_roster::app::AppState;
use cadet_roster::logging;
use test_helpers::{create_test_state, seed_cadet, seed_day, seed_person, StubResolver};

fn transmuted(final_grade: f64) -> String {
    TransmutedGrade::from_final_grade(final_grade).to_string()
}

#[test]
fn test_transmutation_boundaries() {
    assert_eq!(transmuted(74.999), "5.00");
    assert_eq!(transmuted(75.0), "3.00");
    assert_eq!(transmuted(76.999), "3.00");
    assert_eq!(transmuted(77.0), "2.75");
    assert_eq!(transmuted(97.999), "1.25");
    assert_eq!(transmuted(98.0), "1.00");
    assert_eq!(transmuted(100.0), "1.00");
    assert_eq!(transmuted(0.0), "5.00");
    assert_eq!(transmuted(f64::NAN), "5.00");
}

#[test]
fn test_transmutation_is_monotonic() {
    let mut previous = TransmutedGrade::from_final_grade(0.0);
    for step in 0..=10_000 {
        let grade = f64::from(step) / 100.0;
        let current = TransmutedGrade::from_final_grade(grade);
        // a higher grade never transmutes to a worse value
        assert!(current <= previous, "not monotonic at {}", grade);
        previous = current;
    }
}

#[test]
fn test_components_stay_in_bounds() {
    let engine = GradeEngine::new(GradingPolicy {
        total_training_days: 10,
        late_counts_as_present: true,
    });
    let inputs = GradeInputs {
        attendance: AttendanceCounts {
            present: 40,
            ..AttendanceCounts::default()
        },
        recorded_days: 40,
        ledger: LedgerTotals {
            merit_points: 0,
            demerit_points: 500,
        },
        exams: ExamScores::new(250.0, -10.0, 100.0),
    };
    let snapshot = engine.compute("c-1", &inputs);

    assert_eq!(snapshot.attendance_score, 30.0);
    assert_eq!(snapshot.aptitude_score, 0.0);
    assert!(snapshot.subject_score >= 0.0 && snapshot.subject_score <= 40.0);
    assert!(snapshot.final_grade >= 0.0 && snapshot.final_grade <= 100.0);
    assert_eq!(
        snapshot.final_grade,
        snapshot.attendance_score + snapshot.aptitude_score + snapshot.subject_score
    );
}

#[tokio::test]
async fn test_every_write_recomputes_the_snapshot() {
    logging::init_test();
    let (_tmp, state) = create_test_state(StubResolver::default(), "").unwrap();
    // denominator follows the recorded training days
    state
        .config_api
        .update_config(config_keys::TOTAL_TRAINING_DAYS, "0")
        .await
        .unwrap();
    let cadet = seed_cadet(&state, Some("2024-0001"), "Juan", "Dela Cruz").await;
    let day1 = seed_day(&state, 10).await;
    let day2 = seed_day(&state, 11).await;
    let mut events = state.grade_events.subscribe();

    state
        .grade_api
        .update_exam_scores(&cadet.id, ExamScores::new(90.0, 90.0, 90.0))
        .await
        .unwrap();
    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, GradeEventType::ExamScoresChanged);
    assert_eq!(event.cadet_id, cadet.id);

    for day in [&day1, &day2] {
        state
            .grade_api
            .mark_attendance(&cadet.id, &day.id, AttendanceStatus::Present, None)
            .await
            .unwrap();
    }
    // 30 + 30 + 36
    let report = state.grade_api.get_grade_report(&cadet.id).await.unwrap();
    assert!((report.snapshot.final_grade - 96.0).abs() < 1e-9);
    assert_eq!(report.snapshot.transmuted_grade.to_string(), "1.25");

    let snapshot = state
        .grade_api
        .mark_attendance(&cadet.id, &day2.id, AttendanceStatus::Absent, Some("sick bay"))
        .await
        .unwrap()
        .unwrap();
    assert!((snapshot.final_grade - 81.0).abs() < 1e-9);
    assert_eq!(snapshot.transmuted_grade.to_string(), "2.50");

    // dropping the absent day restores full attendance
    let affected = state.roster_api.delete_training_day(&day2.id).await.unwrap();
    assert_eq!(affected, vec![cadet.id.clone()]);
    let report = state.grade_api.get_grade_report(&cadet.id).await.unwrap();
    assert!((report.snapshot.final_grade - 96.0).abs() < 1e-9);

    let (entry, snapshot) = state
        .grade_api
        .add_ledger_entry(&cadet.id, LedgerType::Demerit, 10, "Unauthorized absence")
        .await
        .unwrap();
    assert!((snapshot.aptitude_score - 20.0).abs() < 1e-9);
    state.grade_api.delete_ledger_entry(&entry.id).await.unwrap();
    let report = state.grade_api.get_grade_report(&cadet.id).await.unwrap();
    assert!((report.snapshot.aptitude_score - 30.0).abs() < 1e-9);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event.event_type);
    }
    assert!(seen.contains(&GradeEventType::AttendanceChanged));
    assert!(seen.contains(&GradeEventType::TrainingDayRemoved));
    assert!(seen.contains(&GradeEventType::LedgerChanged));
}

async fn served_attendance(state: &AppState, cadet_id: &str) -> f64 {
    state
        .grade_api
        .get_grade_report(cadet_id)
        .await
        .unwrap()
        .snapshot
        .attendance_score
}

#[tokio::test]
async fn test_day_and_policy_changes_regrade_everyone() {
    let (_tmp, state) = create_test_state(StubResolver::default(), "").unwrap();
    state
        .config_api
        .update_config(config_keys::TOTAL_TRAINING_DAYS, "0")
        .await
        .unwrap();
    let juan = seed_cadet(&state, Some("2024-0001"), "Juan", "Dela Cruz").await;
    let ana = seed_cadet(&state, Some("2024-0002"), "Ana", "Reyes").await;
    let day1 = seed_day(&state, 3).await;
    state
        .grade_api
        .mark_attendance(&juan.id, &day1.id, AttendanceStatus::Present, None)
        .await
        .unwrap();
    state.grade_api.compute_grade(&ana.id).await.unwrap();

    assert!((served_attendance(&state, &juan.id).await - 30.0).abs() < 1e-9);

    // a new day halves Juan's rate even though nobody marked it
    let day2 = seed_day(&state, 4).await;
    assert!((served_attendance(&state, &juan.id).await - 15.0).abs() < 1e-9);

    state
        .config_api
        .update_config(config_keys::TOTAL_TRAINING_DAYS, "10")
        .await
        .unwrap();
    assert!((served_attendance(&state, &juan.id).await - 3.0).abs() < 1e-9);

    // back to recorded days; deleting the unmarked day restores Juan
    state
        .config_api
        .update_config(config_keys::TOTAL_TRAINING_DAYS, "0")
        .await
        .unwrap();
    let affected = state.roster_api.delete_training_day(&day2.id).await.unwrap();
    assert!(affected.is_empty());
    assert!((served_attendance(&state, &juan.id).await - 30.0).abs() < 1e-9);
    assert_eq!(served_attendance(&state, &ana.id).await, 0.0);
}

#[tokio::test]
async fn test_staff_attendance_has_no_grade() {
    let (_tmp, state) = create_test_state(StubResolver::default(), "").unwrap();
    let officer = seed_person(&state, PersonKind::Staff, None, "Rosa", "Lim").await;
    let day = seed_day(&state, 12).await;

    let snapshot = state
        .grade_api
        .mark_attendance(&officer.id, &day.id, AttendanceStatus::Present, None)
        .await
        .unwrap();
    assert!(snapshot.is_none());
    assert!(state.grade_api.compute_grade(&officer.id).await.is_err());
}

#[tokio::test]
async fn test_rejects_invalid_manual_input() {
    let (_tmp, state) = create_test_state(StubResolver::default(), "").unwrap();
    let cadet = seed_cadet(&state, None, "Ana", "Reyes").await;

    assert!(state
        .grade_api
        .add_ledger_entry(&cadet.id, LedgerType::Merit, 0, "nothing")
        .await
        .is_err());
    assert!(state
        .grade_api
        .update_exam_scores(&cadet.id, ExamScores::new(f64::NAN, 80.0, 80.0))
        .await
        .is_err());
    assert!(state.grade_api.compute_grade("missing").await.is_err());
}
