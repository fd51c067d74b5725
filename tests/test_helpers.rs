// ==========================================
// Test helpers
// ==========================================
// Temporary databases, fixed-text extractors and a stub link resolver
// so integration tests never touch the network or an OCR binary.
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use cadet_roster::app::{AppState, ImportPorts};
use cadet_roster::db::open_shared;
use cadet_roster::domain::{Blob, NameParts, NewPerson, Person, PersonKind, TrainingDay};
use cadet_roster::importer::{
    BlobResolver, ExtractionError, ImportError, ImporterResult, TextExtractor,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Temporary database file; the schema is created on first open.
///
/// # Returns
/// - NamedTempFile: keep alive for the duration of the test
/// - String: database path
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("non UTF-8 temp path")?
        .to_string();
    Ok((temp_file, db_path))
}

/// Returns the same text for every input.
pub struct FixedText(pub String);

impl TextExtractor for FixedText {
    fn extract_text(&self, _bytes: &[u8], _mime_type: &str) -> Result<String, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// Blocks for `delay` before answering, like a stuck OCR run.
pub struct SlowText {
    pub delay: Duration,
    pub text: String,
}

impl TextExtractor for SlowText {
    fn extract_text(&self, _bytes: &[u8], _mime_type: &str) -> Result<String, ExtractionError> {
        std::thread::sleep(self.delay);
        Ok(self.text.clone())
    }
}

/// Serves canned blobs per URL; anything else is unresolvable.
#[derive(Default)]
pub struct StubResolver {
    blobs: HashMap<String, Blob>,
}

impl StubResolver {
    pub fn with(mut self, url: &str, blob: Blob) -> Self {
        self.blobs.insert(url.to_string(), blob);
        self
    }
}

#[async_trait]
impl BlobResolver for StubResolver {
    async fn resolve_share_link(&self, url: &str) -> ImporterResult<Blob> {
        self.blobs
            .get(url)
            .cloned()
            .ok_or_else(|| ImportError::UnresolvableLink(format!("{}: not found", url)))
    }
}

pub fn ports(resolver: StubResolver, ocr_text: &str) -> ImportPorts {
    ImportPorts {
        resolver: Arc::new(resolver),
        document_extractor: Arc::new(FixedText(String::new())),
        ocr: Arc::new(FixedText(ocr_text.to_string())),
    }
}

/// AppState over a fresh temporary database.
pub fn create_test_state(
    resolver: StubResolver,
    ocr_text: &str,
) -> Result<(NamedTempFile, AppState), Box<dyn Error>> {
    create_test_state_with_ports(ports(resolver, ocr_text))
}

/// AppState over a fresh temporary database with caller-supplied ports.
pub fn create_test_state_with_ports(
    ports: ImportPorts,
) -> Result<(NamedTempFile, AppState), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let conn = open_shared(&db_path)?;
    let state = AppState::assemble(db_path, conn, ports)?;
    Ok((temp_file, state))
}

pub async fn seed_person(
    state: &AppState,
    kind: PersonKind,
    external_id: Option<&str>,
    first_name: &str,
    last_name: &str,
) -> Person {
    state
        .roster_api
        .create_person(NewPerson {
            kind,
            external_id: external_id.map(str::to_string),
            email: None,
            name: NameParts::new(first_name, last_name),
            unit: None,
        })
        .await
        .expect("seed person")
}

pub async fn seed_cadet(
    state: &AppState,
    external_id: Option<&str>,
    first_name: &str,
    last_name: &str,
) -> Person {
    seed_person(state, PersonKind::Cadet, external_id, first_name, last_name).await
}

pub async fn seed_day(state: &AppState, day: u32) -> TrainingDay {
    let date = NaiveDate::from_ymd_opt(2026, 8, day).expect("valid date");
    state
        .roster_api
        .create_training_day(date, &format!("Drill {}", day), None)
        .await
        .expect("seed training day")
}

pub fn csv_blob(filename: &str, content: &str) -> Blob {
    Blob::new(content.as_bytes().to_vec(), Some(filename), Some("text/csv"))
}
