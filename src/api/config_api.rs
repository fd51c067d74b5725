// ==========================================
// Cadet Roster - Config API
// ==========================================
// Reads and overrides the global config_kv values.
// Values are type-checked per key before they are stored.
// Writes to grading.* keys regrade every cadet before returning.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager};
use crate::engine::{GradeEventType, GradeService};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    /// None when the key is unset and its default applies.
    pub value: Option<String>,
}

pub struct ConfigApi {
    config: Arc<ConfigManager>,
    grades: GradeService,
}

impl ConfigApi {
    pub fn new(config: Arc<ConfigManager>, grades: GradeService) -> Self {
        Self { config, grades }
    }

    /// Every known key with its stored override, if any.
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        config_keys::ALL
            .iter()
            .map(|key| {
                Ok(ConfigItem {
                    key: (*key).to_string(),
                    value: self.config.get_global_config_value(key)?,
                })
            })
            .collect()
    }

    pub async fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        let value = value.trim();
        validate_config_value(key, value)?;
        self.config.set_global_value(key, value)?;
        if is_grading_key(key) {
            self.regrade(key).await?;
        }
        Ok(())
    }

    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config.get_config_snapshot()?)
    }

    /// Validates every entry first; nothing is written if one is bad.
    pub async fn restore_from_snapshot(&self, snapshot_json: &str) -> ApiResult<usize> {
        let entries: std::collections::BTreeMap<String, String> =
            serde_json::from_str(snapshot_json)
                .map_err(|e| ApiError::InvalidInput(format!("bad snapshot: {}", e)))?;
        for (key, value) in &entries {
            validate_config_value(key, value)?;
        }
        let restored = self.config.restore_config_from_snapshot(snapshot_json)?;
        if let Some(key) = entries.keys().find(|k| is_grading_key(k)) {
            self.regrade(key).await?;
        }
        Ok(restored)
    }

    async fn regrade(&self, key: &str) -> ApiResult<()> {
        let regraded = self.grades.regrade_all(GradeEventType::PolicyChanged).await?;
        info!(key, regraded, "grading policy changed");
        Ok(())
    }
}

fn is_grading_key(key: &str) -> bool {
    key.starts_with(config_keys::GRADING_PREFIX)
}

fn validate_config_value(key: &str, value: &str) -> ApiResult<()> {
    let invalid = |reason: &str| {
        Err(ApiError::InvalidInput(format!(
            "{}={:?}: {}",
            key, value, reason
        )))
    };

    match key {
        config_keys::ROSTER_MAX_SIZE
        | config_keys::PROCESSING_TIMEOUT_SECS
        | config_keys::REMOTE_CONNECT_TIMEOUT_SECS
        | config_keys::REMOTE_READ_TIMEOUT_SECS => match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => invalid("expected a positive integer"),
        },
        config_keys::REMOTE_RETRY_BUDGET | config_keys::TOTAL_TRAINING_DAYS => {
            match value.parse::<u32>() {
                Ok(_) => Ok(()),
                Err(_) => invalid("expected a non-negative integer"),
            }
        }
        config_keys::REQUIRE_EXTERNAL_ID
        | config_keys::ASSUME_PRESENT_DEFAULT
        | config_keys::LATE_COUNTS_AS_PRESENT => {
            match value.to_ascii_lowercase().as_str() {
                "1" | "0" | "true" | "false" | "yes" | "no" | "on" | "off" => Ok(()),
                _ => invalid("expected a boolean"),
            }
        }
        config_keys::GENERATED_ID_PREFIX => {
            if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) {
                Ok(())
            } else {
                invalid("expected letters and digits only")
            }
        }
        config_keys::ID_PATTERN => match Regex::new(value) {
            Ok(_) => Ok(()),
            Err(e) => invalid(&e.to_string()),
        },
        _ => invalid("unknown configuration key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::{ExamScores, NameParts, NewPerson, PersonKind};
    use crate::engine::{BroadcastGradePublisher, RosterRepositories};

    fn api() -> (ConfigApi, GradeService) {
        let conn = open_in_memory().unwrap();
        let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
        let grades = GradeService::new(
            RosterRepositories::from_connection(conn),
            config.clone(),
            BroadcastGradePublisher::shared(16),
        );
        (ConfigApi::new(config, grades.clone()), grades)
    }

    #[tokio::test]
    async fn test_update_validates_per_key() {
        let (api, _) = api();
        assert!(api.update_config(config_keys::ROSTER_MAX_SIZE, "0").await.is_err());
        assert!(api.update_config(config_keys::ROSTER_MAX_SIZE, "800").await.is_ok());
        assert!(api.update_config(config_keys::ID_PATTERN, "([").await.is_err());
        assert!(api.update_config("no.such.key", "1").await.is_err());

        let items = api.list_configs().unwrap();
        let max = items
            .iter()
            .find(|i| i.key == config_keys::ROSTER_MAX_SIZE)
            .unwrap();
        assert_eq!(max.value.as_deref(), Some("800"));
    }

    #[tokio::test]
    async fn test_restore_rejects_bad_snapshot_atomically() {
        let (api, _) = api();
        let bad = r#"{"roster.max_size":"600","grading.late_counts_as_present":"maybe"}"#;
        assert!(api.restore_from_snapshot(bad).await.is_err());
        let items = api.list_configs().unwrap();
        assert!(items.iter().all(|i| i.value.is_none()));
    }

    #[tokio::test]
    async fn test_grading_change_regrades_cadets() {
        let (api, grades) = api();
        let cadet = grades
            .repositories()
            .registry
            .create(NewPerson {
                kind: PersonKind::Cadet,
                external_id: Some("2024-0001".to_string()),
                email: None,
                name: NameParts::new("Juan", "Dela Cruz"),
                unit: None,
            })
            .await
            .unwrap();
        let day = grades
            .create_training_day(
                chrono::NaiveDate::from_ymd_opt(2024, 8, 3).unwrap(),
                "Day 1",
                None,
            )
            .await
            .unwrap();
        grades
            .mark_attendance(&cadet.id, &day.id, crate::domain::AttendanceStatus::Present, None)
            .await
            .unwrap();
        grades
            .update_exam_scores(&cadet.id, ExamScores::new(0.0, 0.0, 0.0))
            .await
            .unwrap();
        // 1 of 15 days
        let before = grades.get_snapshot(&cadet.id).await.unwrap().unwrap();
        assert!((before.attendance_score - 2.0).abs() < 1e-9);

        api.update_config(config_keys::TOTAL_TRAINING_DAYS, "10")
            .await
            .unwrap();
        let after = grades.get_snapshot(&cadet.id).await.unwrap().unwrap();
        assert!((after.attendance_score - 3.0).abs() < 1e-9);

        api.restore_from_snapshot(r#"{"grading.total_training_days":"0"}"#)
            .await
            .unwrap();
        let restored = grades.get_snapshot(&cadet.id).await.unwrap().unwrap();
        assert!((restored.attendance_score - 30.0).abs() < 1e-9);
    }
}
