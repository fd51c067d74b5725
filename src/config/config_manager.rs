// ==========================================
// Cadet Roster - Config manager
// ==========================================
// Responsibility: load, query and override configuration
// Storage: config_kv table (key-value + scope), scope 'global'
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::import_config_trait::{
    GradingConfigReader, ImportConfigReader, DEFAULT_ID_PATTERN,
};
use crate::db::{open_sqlite_connection, SharedConnection};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    /// Opens its own connection to `db_path`.
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Shares an existing connection.
    ///
    /// The standard PRAGMAs are re-applied (idempotent).
    pub fn from_connection(conn: SharedConnection) -> ConfigResult<Self> {
        {
            let guard = conn.lock()?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// Reads a value from scope 'global'.
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Upserts a value in scope 'global'.
    pub fn set_global_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "config value updated");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Parses a stored value; malformed values fall back to the default with a warning.
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "malformed config value, using default");
                Ok(default)
            }
        }
    }

    fn get_bool_or_default(&self, key: &str, default: bool) -> ConfigResult<bool> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "malformed boolean config value, using default");
                Ok(default)
            }
        }
    }

    /// All global values as a JSON object (sorted by key).
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// Restores values from [`get_config_snapshot`](Self::get_config_snapshot) output.
    /// Returns the number of keys written.
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let mut count = 0;
        for (key, value) in &config_map {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// ImportConfigReader implementation
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_roster_size(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::ROSTER_MAX_SIZE, 500)
    }

    async fn get_require_external_id(&self) -> ConfigResult<bool> {
        self.get_bool_or_default(config_keys::REQUIRE_EXTERNAL_ID, false)
    }

    async fn get_generated_id_prefix(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::GENERATED_ID_PREFIX, "AUTO")?;
        let value = value.trim().to_uppercase();
        if value.is_empty() {
            Ok("AUTO".to_string())
        } else {
            Ok(value)
        }
    }

    async fn get_id_pattern(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::ID_PATTERN, DEFAULT_ID_PATTERN)?;
        if let Err(e) = regex::Regex::new(&value) {
            return Err(ConfigError::InvalidValue {
                key: config_keys::ID_PATTERN.to_string(),
                value,
                reason: e.to_string(),
            });
        }
        Ok(value)
    }

    async fn get_assume_present_default(&self) -> ConfigResult<bool> {
        self.get_bool_or_default(config_keys::ASSUME_PRESENT_DEFAULT, false)
    }

    async fn get_processing_timeout_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::PROCESSING_TIMEOUT_SECS, 120)
    }

    async fn get_remote_connect_timeout_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::REMOTE_CONNECT_TIMEOUT_SECS, 10)
    }

    async fn get_remote_read_timeout_secs(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::REMOTE_READ_TIMEOUT_SECS, 30)
    }

    async fn get_remote_retry_budget(&self) -> ConfigResult<u32> {
        self.get_parsed_or_default(config_keys::REMOTE_RETRY_BUDGET, 2)
    }
}

// ==========================================
// GradingConfigReader implementation
// ==========================================
#[async_trait]
impl GradingConfigReader for ConfigManager {
    async fn get_total_training_days(&self) -> ConfigResult<u32> {
        self.get_parsed_or_default(config_keys::TOTAL_TRAINING_DAYS, 15)
    }

    async fn get_late_counts_as_present(&self) -> ConfigResult<bool> {
        self.get_bool_or_default(config_keys::LATE_COUNTS_AS_PRESENT, true)
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    // Registry
    pub const ROSTER_MAX_SIZE: &str = "roster.max_size";

    // Import
    pub const REQUIRE_EXTERNAL_ID: &str = "import.require_external_id";
    pub const GENERATED_ID_PREFIX: &str = "import.generated_id_prefix";
    pub const ID_PATTERN: &str = "import.id_pattern";
    pub const ASSUME_PRESENT_DEFAULT: &str = "import.assume_present_default";
    pub const PROCESSING_TIMEOUT_SECS: &str = "import.processing_timeout_secs";

    // Remote links
    pub const REMOTE_CONNECT_TIMEOUT_SECS: &str = "import.remote_connect_timeout_secs";
    pub const REMOTE_READ_TIMEOUT_SECS: &str = "import.remote_read_timeout_secs";
    pub const REMOTE_RETRY_BUDGET: &str = "import.remote_retry_budget";

    // Grading
    pub const TOTAL_TRAINING_DAYS: &str = "grading.total_training_days";
    pub const LATE_COUNTS_AS_PRESENT: &str = "grading.late_counts_as_present";

    /// Keys that change how snapshots are computed.
    pub const GRADING_PREFIX: &str = "grading.";

    pub const ALL: &[&str] = &[
        ROSTER_MAX_SIZE,
        REQUIRE_EXTERNAL_ID,
        GENERATED_ID_PREFIX,
        ID_PATTERN,
        ASSUME_PRESENT_DEFAULT,
        PROCESSING_TIMEOUT_SECS,
        REMOTE_CONNECT_TIMEOUT_SECS,
        REMOTE_READ_TIMEOUT_SECS,
        REMOTE_RETRY_BUDGET,
        TOTAL_TRAINING_DAYS,
        LATE_COUNTS_AS_PRESENT,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::import_config_trait::{GradingPolicy, ImportSettings};
    use crate::db::open_in_memory;

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let config = ConfigManager::from_connection(open_in_memory().unwrap()).unwrap();
        assert_eq!(
            config.load_import_settings().await.unwrap(),
            ImportSettings::default()
        );
        assert_eq!(
            config.load_grading_policy().await.unwrap(),
            GradingPolicy::default()
        );
    }

    #[tokio::test]
    async fn test_overrides_and_malformed_values() {
        let config = ConfigManager::from_connection(open_in_memory().unwrap()).unwrap();
        config.set_global_value(config_keys::ROSTER_MAX_SIZE, "3").unwrap();
        config
            .set_global_value(config_keys::LATE_COUNTS_AS_PRESENT, "no")
            .unwrap();
        config
            .set_global_value(config_keys::TOTAL_TRAINING_DAYS, "fifteen")
            .unwrap();

        assert_eq!(config.get_max_roster_size().await.unwrap(), 3);
        assert!(!config.get_late_counts_as_present().await.unwrap());
        assert_eq!(config.get_total_training_days().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_invalid_id_pattern_is_reported() {
        let config = ConfigManager::from_connection(open_in_memory().unwrap()).unwrap();
        config.set_global_value(config_keys::ID_PATTERN, "([").unwrap();
        assert!(matches!(
            config.get_id_pattern().await,
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_snapshot_restore() {
        let source = ConfigManager::from_connection(open_in_memory().unwrap()).unwrap();
        source.set_global_value(config_keys::ROSTER_MAX_SIZE, "42").unwrap();
        let snapshot = source.get_config_snapshot().unwrap();

        let target = ConfigManager::from_connection(open_in_memory().unwrap()).unwrap();
        assert_eq!(target.restore_config_from_snapshot(&snapshot).unwrap(), 1);
        assert_eq!(
            target
                .get_global_config_value(config_keys::ROSTER_MAX_SIZE)
                .unwrap()
                .as_deref(),
            Some("42")
        );
    }
}
