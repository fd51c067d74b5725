// ==========================================
// Cadet Roster - Importer traits
// ==========================================
// Responsibility: importer interfaces and collaborator ports
// (no implementation here)
// ==========================================

use crate::domain::{Blob, ImportArtifact, ImportRequest, ImportResult};
use crate::importer::error::{ExtractionError, ImporterResult};
use crate::importer::file_parser::ParsedInput;
use async_trait::async_trait;

// ==========================================
// Importer Trait
// ==========================================
// Implementor: ImportOrchestrator
#[async_trait]
pub trait Importer: Send + Sync {
    /// Runs one artifact through detection, parsing, normalization,
    /// matching and application.
    ///
    /// # Returns
    /// - Ok(ImportResult): counts plus per-row errors, also on partial success
    /// - Err(ImportError): whole-file failure; nothing was written
    async fn run_import(
        &self,
        artifact: ImportArtifact,
        request: ImportRequest,
    ) -> ImporterResult<ImportResult>;

    /// Runs several imports concurrently; one failure does not affect the others.
    async fn batch_import(
        &self,
        jobs: Vec<(ImportArtifact, ImportRequest)>,
    ) -> Vec<ImporterResult<ImportResult>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// Implementors: CsvParser, ExcelParser, DocumentParser, ImageParser
// Runs on a blocking thread.
pub trait FileParser: Send + Sync {
    fn parse(&self, blob: &Blob) -> ImporterResult<ParsedInput>;
}

// ==========================================
// TextExtractor Trait (OCR / document text port)
// ==========================================
// Treated as a black box; failures are mapped to ImportError::ExtractionFailed.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError>;
}

// ==========================================
// BlobResolver Trait
// ==========================================
// Used only for remote links.
#[async_trait]
pub trait BlobResolver: Send + Sync {
    /// Resolves a share link to the downloadable file behind it.
    ///
    /// Fails with UnresolvableLink when no direct file can be obtained
    /// (login pages, HTML-only responses, exhausted retries).
    async fn resolve_share_link(&self, url: &str) -> ImporterResult<Blob>;
}
