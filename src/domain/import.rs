// ==========================================
// Cadet Roster - Import domain model
// ==========================================
// Candidate: transient, lives only within one import run
// ImportResult: immutable once returned, never persisted as such
// ImportBatch: audit row written per run
// ==========================================

use crate::domain::person::NameParts;
use crate::domain::types::{AttendanceStatus, LedgerType, PersonKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Blob / ImportArtifact - raw input
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, filename: Option<&str>, content_type: Option<&str>) -> Self {
        Self {
            bytes,
            filename: filename.map(str::to_string),
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn label(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("<{} bytes>", self.bytes.len()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportArtifact {
    Blob(Blob),
    Url(String),
}

impl ImportArtifact {
    pub fn label(&self) -> String {
        match self {
            ImportArtifact::Blob(blob) => blob.label(),
            ImportArtifact::Url(url) => url.clone(),
        }
    }
}

// ==========================================
// ImportKind / ImportRequest
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportKind {
    /// Registry upsert; unmatched rows create persons.
    Roster,
    /// Attendance marks for one training day; never creates persons.
    Attendance { day_id: String },
    /// Merit / demerit entries; never creates persons.
    Ledger,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Roster => "ROSTER",
            ImportKind::Attendance { .. } => "ATTENDANCE",
            ImportKind::Ledger => "LEDGER",
        }
    }

    pub fn may_create(&self) -> bool {
        matches!(self, ImportKind::Roster)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub kind: ImportKind,
    pub registry: PersonKind,
    /// "assume present unless marked otherwise"; None uses the configured default.
    pub assume_present: Option<bool>,
}

impl ImportRequest {
    pub fn roster(registry: PersonKind) -> Self {
        Self {
            kind: ImportKind::Roster,
            registry,
            assume_present: None,
        }
    }

    pub fn attendance(registry: PersonKind, day_id: &str) -> Self {
        Self {
            kind: ImportKind::Attendance {
                day_id: day_id.to_string(),
            },
            registry,
            assume_present: None,
        }
    }

    pub fn ledger() -> Self {
        Self {
            kind: ImportKind::Ledger,
            registry: PersonKind::Cadet,
            assume_present: None,
        }
    }

    pub fn assuming_present(mut self, assume: bool) -> Self {
        self.assume_present = Some(assume);
        self
    }
}

// ==========================================
// Candidate - normalized, unvalidated row
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub entry_type: LedgerType,
    pub points: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Candidate {
    pub row: usize,
    pub raw_text: String,
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<NameParts>,
    pub unit: Option<String>,
    pub status: Option<AttendanceStatus>,
    /// Status came from "assume present", not from the row.
    pub status_defaulted: bool,
    pub remarks: Option<String>,
    pub ledger: Option<LedgerLine>,
}

impl Candidate {
    pub fn has_identifier(&self) -> bool {
        self.external_id.is_some()
            || self.email.is_some()
            || self.name.as_ref().is_some_and(NameParts::is_complete)
    }
}

// ==========================================
// RowError - per-row outcome, never thrown
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowErrorKind {
    /// Row identifies someone but its intent (status, ledger type) is unclear.
    AmbiguousRow,
    /// No ID, email or plausible full name.
    NoIdentifiableCandidate,
    /// Registry lookup failed or was ambiguous.
    NoMatch,
    /// A cell could not be converted.
    Malformed,
    /// The store refused the write (e.g. uniqueness).
    Rejected,
}

impl RowErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowErrorKind::AmbiguousRow => "AmbiguousRow",
            RowErrorKind::NoIdentifiableCandidate => "NoIdentifiableCandidate",
            RowErrorKind::NoMatch => "NoMatch",
            RowErrorKind::Malformed => "Malformed",
            RowErrorKind::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub kind: RowErrorKind,
    pub reason: String,
    pub raw_text: String,
}

impl RowError {
    pub fn new(row: usize, kind: RowErrorKind, reason: impl Into<String>, raw_text: &str) -> Self {
        Self {
            row,
            kind,
            reason: reason.into(),
            raw_text: raw_text.to_string(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {} ({})", self.row, self.reason, self.kind.as_str())?;
        if !self.raw_text.is_empty() {
            write!(f, " [{}]", self.raw_text)?;
        }
        Ok(())
    }
}

// ==========================================
// ImportResult
// ==========================================
/// An external ID synthesized during roster creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedId {
    pub row: usize,
    pub person_id: String,
    pub external_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub batch_id: String,
    pub kind: ImportKind,
    pub source: String,
    pub total_rows: usize,
    /// Rows resolved to an existing entity and applied.
    pub matched: usize,
    /// Persons created (roster imports only).
    pub created: usize,
    /// Matched rows that actually changed a registry entry.
    pub updated: usize,
    /// Rows not applied; each has an entry in `errors`.
    pub skipped: usize,
    pub errors: Vec<RowError>,
    pub generated_ids: Vec<GeneratedId>,
    pub elapsed_ms: u64,
}

impl ImportResult {
    pub fn new(batch_id: &str, kind: ImportKind, source: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            kind,
            source: source.to_string(),
            total_rows: 0,
            matched: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            errors: Vec::new(),
            generated_ids: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn record_error(&mut self, error: RowError) {
        self.skipped += 1;
        self.errors.push(error);
    }

    /// Human-readable per-row error lines, in row order.
    pub fn error_report(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

// ==========================================
// ImportBatch - audit record of one run
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub kind: String,
    pub registry: PersonKind,
    pub source: String,
    pub total_rows: usize,
    pub matched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors_json: String,
    pub elapsed_ms: u64,
    pub imported_at: DateTime<Utc>,
}
