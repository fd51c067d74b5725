// ==========================================
// Cadet Roster - Roster API
// ==========================================
// Registry and training-day administration.
// Listings go through the stale-then-refresh cache; every registry
// mutation invalidates it.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_email, validate_new_person, validate_title};
use crate::cache::RosterCache;
use crate::domain::{
    AttendanceRecord, EnrollmentStatus, NewPerson, Person, PersonKind, PersonPatch, TrainingDay,
};
use crate::engine::GradeService;
use crate::repository::RepositoryError;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

pub struct RosterApi {
    grades: GradeService,
    cache: RosterCache,
}

impl RosterApi {
    pub fn new(grades: GradeService, cache: RosterCache) -> Self {
        Self { grades, cache }
    }

    // ==========================================
    // Registry
    // ==========================================

    pub async fn create_person(&self, person: NewPerson) -> ApiResult<Person> {
        validate_new_person(&person)?;
        let kind = person.kind;
        let created = self.grades.repositories().registry.create(person).await?;
        self.cache.invalidate(&kind);
        info!(person_id = %created.id, kind = %kind, "registry entry created");
        Ok(created)
    }

    pub async fn get_person(&self, person_id: &str) -> ApiResult<Person> {
        self.grades
            .repositories()
            .registry
            .find_by_id(person_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("person {}", person_id)))
    }

    /// Applies a non-destructive patch; unchanged entries are not written.
    pub async fn update_person(&self, person_id: &str, patch: PersonPatch) -> ApiResult<Person> {
        if let Some(email) = patch.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        let mut person = self.get_person(person_id).await?;
        if patch.apply_to(&mut person) {
            self.grades.repositories().registry.update(&person).await?;
            self.cache.invalidate(&person.kind);
        }
        Ok(person)
    }

    /// Enrollment flags change the displayed remark, never the stored grade.
    pub async fn set_enrollment(
        &self,
        person_id: &str,
        enrollment: EnrollmentStatus,
    ) -> ApiResult<Person> {
        self.update_person(
            person_id,
            PersonPatch {
                enrollment: Some(enrollment),
                ..PersonPatch::default()
            },
        )
        .await
    }

    pub async fn delete_person(&self, person_id: &str) -> ApiResult<()> {
        let person = self.get_person(person_id).await?;
        if !self.grades.repositories().registry.delete(person_id).await? {
            return Err(ApiError::NotFound(format!("person {}", person_id)));
        }
        self.cache.invalidate(&person.kind);
        info!(person_id, "registry entry deleted");
        Ok(())
    }

    pub async fn list_roster(&self, kind: PersonKind) -> ApiResult<Vec<Person>> {
        Ok(self.grades.repositories().registry.list(kind).await?)
    }

    /// Cached listing: may be briefly stale, refreshed in the background.
    pub async fn list_roster_cached(&self, kind: PersonKind) -> ApiResult<Arc<Vec<Person>>> {
        let registry = self.grades.repositories().registry.clone();
        self.cache
            .get_stale_then_refresh(kind, move || async move {
                registry.list(kind).await.map(Arc::new)
            })
            .await
            .map_err(ApiError::from)
    }

    pub async fn roster_size(&self, kind: PersonKind) -> ApiResult<usize> {
        Ok(self.grades.repositories().registry.count(kind).await?)
    }

    // ==========================================
    // Training days
    // ==========================================

    pub async fn create_training_day(
        &self,
        date: NaiveDate,
        title: &str,
        description: Option<&str>,
    ) -> ApiResult<TrainingDay> {
        validate_title(title)?;
        Ok(self
            .grades
            .create_training_day(date, title.trim(), description)
            .await?)
    }

    pub async fn list_training_days(&self) -> ApiResult<Vec<TrainingDay>> {
        Ok(self.grades.repositories().training_days.list().await?)
    }

    /// Removes the day and its records; affected cadets are regraded.
    pub async fn delete_training_day(&self, day_id: &str) -> ApiResult<Vec<String>> {
        match self.grades.delete_training_day(day_id).await {
            Ok(affected) => Ok(affected),
            Err(crate::engine::GradeError::Repository(RepositoryError::NotFound { .. })) => {
                Err(ApiError::NotFound(format!("training day {}", day_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn attendance_for_day(&self, day_id: &str) -> ApiResult<Vec<AttendanceRecord>> {
        Ok(self
            .grades
            .repositories()
            .attendance
            .list_by_day(day_id)
            .await?)
    }
}
