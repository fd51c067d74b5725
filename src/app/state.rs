// ==========================================
// Cadet Roster - Application state
// ==========================================
// Composition root: one shared connection, the stores over it, the
// grade service, the importer and the API objects built on top.
// ==========================================

use crate::api::{ConfigApi, GradeApi, ImportApi, RosterApi};
use crate::cache::{RosterCache, StaleCache};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{open_shared, SharedConnection};
use crate::engine::{BroadcastGradePublisher, GradeService, RosterRepositories};
use crate::importer::{
    BlobResolver, DocumentTextExtractor, HttpBlobResolver, ImportOrchestrator, TesseractCliOcr,
    TextExtractor, UniversalFileParser,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "CADET_ROSTER_DB_PATH";

/// How long a cached roster listing counts as fresh.
const ROSTER_CACHE_TTL: Duration = Duration::from_secs(30);

/// External collaborators of the importer.
#[derive(Clone)]
pub struct ImportPorts {
    pub resolver: Arc<dyn BlobResolver>,
    pub document_extractor: Arc<dyn TextExtractor>,
    pub ocr: Arc<dyn TextExtractor>,
}

pub struct AppState {
    pub db_path: String,
    pub config_manager: Arc<ConfigManager>,
    pub import_api: Arc<ImportApi>,
    pub grade_api: Arc<GradeApi>,
    pub roster_api: Arc<RosterApi>,
    pub config_api: Arc<ConfigApi>,
    /// Subscribe here for grade changes instead of polling.
    pub grade_events: Arc<BroadcastGradePublisher>,
    pub roster_cache: RosterCache,
}

impl AppState {
    /// Opens (and migrates) the database and wires the default collaborators:
    /// HTTP share-link resolver, PDF/DOCX text extraction and tesseract OCR.
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "initializing application state");

        let conn = open_shared(&db_path).map_err(|e| format!("cannot open database: {}", e))?;
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("cannot create ConfigManager: {}", e))?;
        let settings = config
            .load_import_settings()
            .await
            .map_err(|e| format!("cannot load import settings: {}", e))?;

        let resolver = HttpBlobResolver::new(
            settings.remote_connect_timeout,
            settings.remote_read_timeout,
            settings.remote_retry_budget,
        )
        .map_err(|e| format!("cannot create HTTP client: {}", e))?;

        let ports = ImportPorts {
            resolver: Arc::new(resolver),
            document_extractor: Arc::new(DocumentTextExtractor),
            ocr: Arc::new(TesseractCliOcr::default()),
        };
        Self::assemble(db_path, conn, ports)
    }

    /// Builds the state over an existing connection with the given collaborators.
    pub fn assemble(
        db_path: String,
        conn: SharedConnection,
        ports: ImportPorts,
    ) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let repos = RosterRepositories::from_connection(conn);
        let grade_events = BroadcastGradePublisher::shared(256);
        let roster_cache: RosterCache = StaleCache::new(ROSTER_CACHE_TTL);

        let grades = GradeService::new(repos.clone(), config_manager.clone(), grade_events.clone());
        let orchestrator = ImportOrchestrator::new(
            grades.clone(),
            config_manager.clone(),
            UniversalFileParser::new(ports.document_extractor, ports.ocr),
            ports.resolver,
            roster_cache.clone(),
        );

        Ok(Self {
            db_path,
            import_api: Arc::new(ImportApi::new(
                Arc::new(orchestrator),
                repos.import_batches.clone(),
            )),
            grade_api: Arc::new(GradeApi::new(grades.clone())),
            roster_api: Arc::new(RosterApi::new(grades.clone(), roster_cache.clone())),
            config_api: Arc::new(ConfigApi::new(config_manager.clone(), grades)),
            config_manager,
            grade_events,
            roster_cache,
        })
    }
}

/// Database location: `CADET_ROSTER_DB_PATH`, else the user data directory,
/// else the working directory.
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./cadet_roster.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("cadet-roster");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("cadet_roster.db");
        }
    }
    path.to_string_lossy().to_string()
}
