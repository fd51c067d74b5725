// ==========================================
// Cadet Roster - Import API
// ==========================================
// Entry point for callers: files, in-memory blobs and share links.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{Blob, ImportArtifact, ImportBatch, ImportRequest, ImportResult};
use crate::importer::Importer;
use crate::repository::ImportBatchRepository;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub struct ImportApi {
    importer: Arc<dyn Importer>,
    batches: Arc<dyn ImportBatchRepository>,
}

impl ImportApi {
    pub fn new(importer: Arc<dyn Importer>, batches: Arc<dyn ImportBatchRepository>) -> Self {
        Self { importer, batches }
    }

    /// Runs one import.
    ///
    /// # Returns
    /// - Ok(ImportResult): counts and per-row errors (also on partial success)
    /// - Err(ApiError): whole-file failure, nothing written
    pub async fn run_import(
        &self,
        artifact: ImportArtifact,
        request: ImportRequest,
    ) -> ApiResult<ImportResult> {
        let label = artifact.label();
        self.importer
            .run_import(artifact, request)
            .await
            .map_err(|e| {
                warn!(source = %label, error = %e, "import rejected");
                ApiError::from(e)
            })
    }

    /// Reads a local file and imports it; the file name drives format detection.
    pub async fn run_import_file(
        &self,
        path: &Path,
        request: ImportRequest,
    ) -> ApiResult<ImportResult> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        let filename = path.file_name().and_then(|n| n.to_str());
        let blob = Blob::new(bytes, filename, None);
        self.run_import(ImportArtifact::Blob(blob), request).await
    }

    /// Imports several artifacts concurrently; results keep the input order.
    pub async fn run_batch_import(
        &self,
        jobs: Vec<(ImportArtifact, ImportRequest)>,
    ) -> Vec<ApiResult<ImportResult>> {
        self.importer
            .batch_import(jobs)
            .await
            .into_iter()
            .map(|r| r.map_err(ApiError::from))
            .collect()
    }

    pub async fn recent_batches(&self, limit: usize) -> ApiResult<Vec<ImportBatch>> {
        Ok(self.batches.list_recent(limit).await?)
    }

    pub async fn get_batch(&self, batch_id: &str) -> ApiResult<ImportBatch> {
        self.batches
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("import batch {}", batch_id)))
    }
}
