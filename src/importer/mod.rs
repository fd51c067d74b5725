// ==========================================
// Cadet Roster - Importer layer
// ==========================================
// Responsibility: turn an uploaded artifact (spreadsheet, document,
// screenshot or share link) into registry / attendance / ledger writes
// Inputs: CSV, Excel, PDF, DOCX, plain text, images (OCR), http(s) links
// ==========================================

pub mod data_cleaner;
pub mod entity_matcher;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod format_detector;
pub mod id_generator;
pub mod import_orchestrator;
pub mod importer_trait;
pub mod remote_link;
pub mod row_normalizer;
pub mod text_extractor;

pub use data_cleaner::DataCleaner;
pub use entity_matcher::{EntityMatcher, MatchResult, MatchTier};
pub use error::{ExtractionError, ImportError, ImporterResult};
pub use field_mapper::{CanonicalField, FieldMapper, RawRecord};
pub use file_parser::{
    CsvParser, DocumentParser, ExcelParser, ImageParser, ParsedInput, UniversalFileParser,
};
pub use format_detector::{DocumentFormat, FormatClass, FormatDetector, TabularFormat};
pub use id_generator::IdGenerator;
pub use import_orchestrator::ImportOrchestrator;
pub use importer_trait::{BlobResolver, FileParser, Importer, TextExtractor};
pub use remote_link::{rewrite_share_link, HttpBlobResolver};
pub use row_normalizer::RowNormalizer;
pub use text_extractor::{DocumentTextExtractor, TesseractCliOcr, UnavailableOcr};
