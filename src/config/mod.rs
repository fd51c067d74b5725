// ==========================================
// Cadet Roster - Configuration layer
// ==========================================
// Responsibility: system configuration with stored overrides
// Storage: config_kv table
// ==========================================

pub mod config_manager;
pub mod error;
pub mod import_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use import_config_trait::{
    GradingConfigReader, GradingPolicy, ImportConfigReader, ImportSettings, DEFAULT_ID_PATTERN,
};
