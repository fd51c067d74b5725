// ==========================================
// Cadet Roster - Grade service
// ==========================================
// Every fact write (attendance, ledger, exam scores) for a person runs
// under that person's lock and, for cadets, recomputes and saves the
// snapshot before returning. Snapshots are therefore never stale.
// ==========================================

use crate::config::GradingConfigReader;
use crate::domain::{
    AttendanceRecord, AttendanceStatus, ExamScores, GradeSnapshot, LedgerEntry, LedgerType,
    Person, PersonKind, TrainingDay,
};
use crate::engine::error::{GradeError, GradeResult};
use crate::engine::events::{GradeEvent, GradeEventPublisher, GradeEventType};
use crate::engine::grade::{GradeEngine, GradeInputs};
use crate::engine::key_lock::KeyedLocks;
use crate::engine::repositories::RosterRepositories;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct GradeService {
    repos: RosterRepositories,
    config: Arc<dyn GradingConfigReader>,
    publisher: Arc<dyn GradeEventPublisher>,
    locks: KeyedLocks,
}

impl GradeService {
    pub fn new(
        repos: RosterRepositories,
        config: Arc<dyn GradingConfigReader>,
        publisher: Arc<dyn GradeEventPublisher>,
    ) -> Self {
        Self {
            repos,
            config,
            publisher,
            locks: KeyedLocks::new(),
        }
    }

    pub fn repositories(&self) -> &RosterRepositories {
        &self.repos
    }

    // ==========================================
    // Reads / recompute
    // ==========================================

    /// Recomputes and stores the cadet's snapshot from current facts.
    #[instrument(skip(self))]
    pub async fn compute_grade(&self, cadet_id: &str) -> GradeResult<GradeSnapshot> {
        let _guard = self.locks.lock(cadet_id).await;
        let person = self.require_cadet(cadet_id).await?;
        self.recompute_locked(&person, GradeEventType::ManualRecompute)
            .await
    }

    /// Stored snapshot, if one was ever computed.
    pub async fn get_snapshot(&self, cadet_id: &str) -> GradeResult<Option<GradeSnapshot>> {
        Ok(self.repos.snapshots.find(cadet_id).await?)
    }

    // ==========================================
    // Fact writes
    // ==========================================

    /// Upserts the (person, day) record. Returns the new snapshot for cadets.
    #[instrument(skip(self, remarks), fields(status = status.as_str()))]
    pub async fn mark_attendance(
        &self,
        person_id: &str,
        day_id: &str,
        status: AttendanceStatus,
        remarks: Option<&str>,
    ) -> GradeResult<Option<GradeSnapshot>> {
        let _guard = self.locks.lock(person_id).await;
        let person = self.require_person(person_id).await?;
        if self.repos.training_days.find_by_id(day_id).await?.is_none() {
            return Err(GradeError::TrainingDayNotFound(day_id.to_string()));
        }

        self.repos
            .attendance
            .upsert(&AttendanceRecord {
                person_id: person_id.to_string(),
                day_id: day_id.to_string(),
                status,
                remarks: remarks.map(str::to_string),
                updated_at: Utc::now(),
            })
            .await?;
        debug!(person_id, day_id, "attendance marked");

        self.recompute_if_cadet(&person, GradeEventType::AttendanceChanged)
            .await
    }

    #[instrument(skip(self, reason))]
    pub async fn append_ledger(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
    ) -> GradeResult<(LedgerEntry, GradeSnapshot)> {
        let _guard = self.locks.lock(cadet_id).await;
        let person = self.require_cadet(cadet_id).await?;
        let entry = self
            .repos
            .ledger
            .append(cadet_id, entry_type, points, reason)
            .await?;
        let snapshot = self
            .recompute_locked(&person, GradeEventType::LedgerChanged)
            .await?;
        Ok((entry, snapshot))
    }

    /// Idempotent append keyed by `source_key`; recomputes only when a row was added.
    pub async fn append_imported_ledger(
        &self,
        cadet_id: &str,
        entry_type: LedgerType,
        points: u32,
        reason: &str,
        source_key: &str,
    ) -> GradeResult<Option<LedgerEntry>> {
        let _guard = self.locks.lock(cadet_id).await;
        let person = self.require_cadet(cadet_id).await?;
        let entry = self
            .repos
            .ledger
            .append_imported(cadet_id, entry_type, points, reason, source_key)
            .await?;
        if entry.is_some() {
            self.recompute_locked(&person, GradeEventType::LedgerChanged)
                .await?;
        }
        Ok(entry)
    }

    /// Removes a ledger entry; false when it did not exist.
    #[instrument(skip(self))]
    pub async fn delete_ledger_entry(&self, entry_id: &str) -> GradeResult<bool> {
        let Some(entry) = self.repos.ledger.find_by_id(entry_id).await? else {
            return Ok(false);
        };
        let _guard = self.locks.lock(&entry.cadet_id).await;
        if !self.repos.ledger.delete(entry_id).await? {
            return Ok(false);
        }
        if let Some(person) = self.repos.registry.find_by_id(&entry.cadet_id).await? {
            self.recompute_locked(&person, GradeEventType::LedgerChanged)
                .await?;
        }
        Ok(true)
    }

    /// Stores clamped scores and recomputes.
    #[instrument(skip(self))]
    pub async fn update_exam_scores(
        &self,
        cadet_id: &str,
        scores: ExamScores,
    ) -> GradeResult<GradeSnapshot> {
        let _guard = self.locks.lock(cadet_id).await;
        let person = self.require_cadet(cadet_id).await?;
        self.repos
            .exam_scores
            .upsert(cadet_id, &scores.clamped())
            .await?;
        self.recompute_locked(&person, GradeEventType::ExamScoresChanged)
            .await
    }

    /// Adds a training day. When the attendance denominator is the number of
    /// recorded days, every cadet's snapshot moves and is recomputed.
    #[instrument(skip(self, description))]
    pub async fn create_training_day(
        &self,
        date: NaiveDate,
        title: &str,
        description: Option<&str>,
    ) -> GradeResult<TrainingDay> {
        let day = self
            .repos
            .training_days
            .create(date, title, description)
            .await?;
        if self.denominator_follows_days().await? {
            self.regrade_all(GradeEventType::TrainingDayAdded).await?;
        }
        info!(day_id = %day.id, "training day created");
        Ok(day)
    }

    /// Deletes the day with its records and recomputes every affected cadet.
    /// Returns the persons that had a record on the day.
    #[instrument(skip(self))]
    pub async fn delete_training_day(&self, day_id: &str) -> GradeResult<Vec<String>> {
        let affected = self.repos.training_days.delete(day_id).await?;

        if self.denominator_follows_days().await? {
            self.regrade_all(GradeEventType::TrainingDayRemoved).await?;
        } else {
            for person_id in &affected {
                let _guard = self.locks.lock(person_id).await;
                if let Some(person) = self.repos.registry.find_by_id(person_id).await? {
                    self.recompute_if_cadet(&person, GradeEventType::TrainingDayRemoved)
                        .await?;
                }
            }
        }
        info!(day_id, affected = affected.len(), "training day deleted");
        Ok(affected)
    }

    /// Recomputes every cadet, one lock at a time. Used after policy changes.
    #[instrument(skip(self))]
    pub async fn regrade_all(&self, cause: GradeEventType) -> GradeResult<usize> {
        let cadets = self.repos.registry.list(PersonKind::Cadet).await?;
        let mut regraded = 0;
        for cadet in &cadets {
            let _guard = self.locks.lock(&cadet.id).await;
            // re-read under the lock; the entry may have been deleted meanwhile
            if let Some(person) = self.repos.registry.find_by_id(&cadet.id).await? {
                self.recompute_locked(&person, cause).await?;
                regraded += 1;
            }
        }
        debug!(regraded, cause = cause.as_str(), "cadets regraded");
        Ok(regraded)
    }

    // ==========================================
    // Internals (caller holds the person's lock)
    // ==========================================

    async fn denominator_follows_days(&self) -> GradeResult<bool> {
        Ok(self.config.load_grading_policy().await?.total_training_days == 0)
    }

    async fn require_person(&self, person_id: &str) -> GradeResult<Person> {
        self.repos
            .registry
            .find_by_id(person_id)
            .await?
            .ok_or_else(|| GradeError::PersonNotFound(person_id.to_string()))
    }

    async fn require_cadet(&self, cadet_id: &str) -> GradeResult<Person> {
        let person = self.require_person(cadet_id).await?;
        if person.kind != PersonKind::Cadet {
            return Err(GradeError::NotACadet(person.display_name()));
        }
        Ok(person)
    }

    async fn recompute_if_cadet(
        &self,
        person: &Person,
        cause: GradeEventType,
    ) -> GradeResult<Option<GradeSnapshot>> {
        if person.kind != PersonKind::Cadet {
            return Ok(None);
        }
        self.recompute_locked(person, cause).await.map(Some)
    }

    async fn recompute_locked(
        &self,
        person: &Person,
        cause: GradeEventType,
    ) -> GradeResult<GradeSnapshot> {
        let policy = self.config.load_grading_policy().await?;
        let recorded_days = self.repos.training_days.count().await?;
        let inputs = GradeInputs {
            attendance: self.repos.attendance.count_by_status(&person.id).await?,
            recorded_days: u32::try_from(recorded_days).unwrap_or(u32::MAX),
            ledger: self.repos.ledger.sum_by_cadet(&person.id).await?,
            exams: self.repos.exam_scores.get(&person.id).await?,
        };

        let snapshot = GradeEngine::new(policy).compute(&person.id, &inputs);
        self.repos.snapshots.save(&snapshot).await?;
        debug!(
            cadet_id = %person.id,
            final_grade = snapshot.final_grade,
            transmuted = %snapshot.transmuted_grade,
            cause = cause.as_str(),
            "grade recomputed"
        );

        self.publisher.publish(GradeEvent {
            cadet_id: person.id.clone(),
            event_type: cause,
            final_grade: snapshot.final_grade,
            transmuted_grade: snapshot.transmuted_grade,
        });
        Ok(snapshot)
    }
}
