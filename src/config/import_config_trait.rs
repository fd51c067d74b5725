// ==========================================
// Cadet Roster - Config reader traits
// ==========================================
// Responsibility: read-only configuration interfaces for the
// importer and the grade engine (no implementation here)
// Rule: no config writes, no business logic
// ==========================================

use crate::config::error::ConfigResult;
use async_trait::async_trait;
use std::time::Duration;

/// Default institution ID token: optional letter prefix, then digit groups.
/// Matches "2024-0001", "O-12345", "AFP/21-004512".
pub const DEFAULT_ID_PATTERN: &str = r"(?i)\b(?:[a-z]{1,4}[-/])?\d{2,4}[-/]?\d{3,}\b";

// ==========================================
// ImportSettings - snapshot used by one import run
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub max_roster_size: usize,
    pub require_external_id: bool,
    pub generated_id_prefix: String,
    pub id_pattern: String,
    pub assume_present_default: bool,
    pub processing_timeout: Duration,
    pub remote_connect_timeout: Duration,
    pub remote_read_timeout: Duration,
    pub remote_retry_budget: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_roster_size: 500,
            require_external_id: false,
            generated_id_prefix: "AUTO".to_string(),
            id_pattern: DEFAULT_ID_PATTERN.to_string(),
            assume_present_default: false,
            processing_timeout: Duration::from_secs(120),
            remote_connect_timeout: Duration::from_secs(10),
            remote_read_timeout: Duration::from_secs(30),
            remote_retry_budget: 2,
        }
    }
}

// ==========================================
// GradingPolicy
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingPolicy {
    /// Attendance denominator; 0 means "number of recorded training days".
    pub total_training_days: u32,
    pub late_counts_as_present: bool,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            total_training_days: 15,
            late_counts_as_present: true,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// Implementor: ConfigManager (config_kv table)
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// Hard cap per registry. Default 500.
    async fn get_max_roster_size(&self) -> ConfigResult<usize>;

    /// Synthesize an ID when a roster creation has none. Default false.
    async fn get_require_external_id(&self) -> ConfigResult<bool>;

    /// Default "AUTO".
    async fn get_generated_id_prefix(&self) -> ConfigResult<String>;

    /// Regex for external ID tokens. Default [`DEFAULT_ID_PATTERN`].
    async fn get_id_pattern(&self) -> ConfigResult<String>;

    /// "Assume present unless marked" for attendance imports. Default false.
    async fn get_assume_present_default(&self) -> ConfigResult<bool>;

    async fn get_processing_timeout_secs(&self) -> ConfigResult<u64>;

    async fn get_remote_connect_timeout_secs(&self) -> ConfigResult<u64>;

    async fn get_remote_read_timeout_secs(&self) -> ConfigResult<u64>;

    /// Retries for network failures only. Default 2.
    async fn get_remote_retry_budget(&self) -> ConfigResult<u32>;

    async fn load_import_settings(&self) -> ConfigResult<ImportSettings> {
        Ok(ImportSettings {
            max_roster_size: self.get_max_roster_size().await?,
            require_external_id: self.get_require_external_id().await?,
            generated_id_prefix: self.get_generated_id_prefix().await?,
            id_pattern: self.get_id_pattern().await?,
            assume_present_default: self.get_assume_present_default().await?,
            processing_timeout: Duration::from_secs(self.get_processing_timeout_secs().await?),
            remote_connect_timeout: Duration::from_secs(
                self.get_remote_connect_timeout_secs().await?,
            ),
            remote_read_timeout: Duration::from_secs(self.get_remote_read_timeout_secs().await?),
            remote_retry_budget: self.get_remote_retry_budget().await?,
        })
    }
}

// ==========================================
// GradingConfigReader Trait
// ==========================================
#[async_trait]
pub trait GradingConfigReader: Send + Sync {
    async fn get_total_training_days(&self) -> ConfigResult<u32>;

    async fn get_late_counts_as_present(&self) -> ConfigResult<bool>;

    async fn load_grading_policy(&self) -> ConfigResult<GradingPolicy> {
        Ok(GradingPolicy {
            total_training_days: self.get_total_training_days().await?,
            late_counts_as_present: self.get_late_counts_as_present().await?,
        })
    }
}
