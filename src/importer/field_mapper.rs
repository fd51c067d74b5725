// ==========================================
// Cadet Roster - Field mapper
// ==========================================
// Responsibility: source header → canonical field, header-row discovery,
// ParsedInput → RawRecord sequence
// ==========================================

use crate::importer::file_parser::{ParsedInput, SheetRow, TabularSheet};
use std::collections::HashMap;

/// Rows scanned when looking for the header row.
pub const HEADER_SCAN_ROWS: usize = 10;

/// A header row needs at least this many recognized columns.
const MIN_HEADER_MATCHES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    ExternalId,
    Email,
    FirstName,
    MiddleName,
    LastName,
    FullName,
    Suffix,
    Unit,
    Status,
    Remarks,
    LedgerType,
    Points,
    Reason,
}

impl CanonicalField {
    /// Header aliases, compared after [`normalize_header`].
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::ExternalId => &[
                "id",
                "studentid",
                "studentno",
                "studentnumber",
                "idnumber",
                "idno",
                "afpsn",
                "serialnumber",
                "cadetid",
                "externalid",
            ],
            CanonicalField::Email => &["email", "emailaddress"],
            CanonicalField::FirstName => &["firstname", "fname", "givenname", "first"],
            CanonicalField::MiddleName => &["middlename", "mname", "mi", "middleinitial", "middle"],
            CanonicalField::LastName => &["lastname", "lname", "surname", "familyname", "last"],
            CanonicalField::FullName => &["name", "fullname", "cadetname", "studentname", "completename"],
            CanonicalField::Suffix => &["suffix", "ext", "extension", "nameextension"],
            CanonicalField::Unit => &["unit", "platoon", "company", "battalion", "unitassignment"],
            CanonicalField::Status => &["status", "attendance"],
            CanonicalField::Remarks => &["remarks", "notes", "comment"],
            CanonicalField::LedgerType => &["type", "meritdemerit", "entrytype"],
            CanonicalField::Points => &["points", "pts"],
            CanonicalField::Reason => &["reason", "description", "offense", "violation"],
        }
    }

    const ALL: [CanonicalField; 13] = [
        CanonicalField::ExternalId,
        CanonicalField::Email,
        CanonicalField::FirstName,
        CanonicalField::MiddleName,
        CanonicalField::LastName,
        CanonicalField::FullName,
        CanonicalField::Suffix,
        CanonicalField::Unit,
        CanonicalField::Status,
        CanonicalField::Remarks,
        CanonicalField::LedgerType,
        CanonicalField::Points,
        CanonicalField::Reason,
    ];

    pub fn from_header(header: &str) -> Option<Self> {
        let key = normalize_header(header);
        if key.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&key.as_str()))
    }
}

/// Lowercase with spaces, `_`, `-`, `.` removed ("First Name" → "firstname").
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '.' | '#'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ==========================================
// RawRecord - one row or line entering the normalizer
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// Tabular row mapped through the header.
    Fields {
        row: usize,
        fields: HashMap<CanonicalField, String>,
        raw_text: String,
    },
    /// Unstructured line (document, OCR, or a sheet without a header).
    Line { row: usize, text: String },
}

impl RawRecord {
    pub fn row(&self) -> usize {
        match self {
            RawRecord::Fields { row, .. } | RawRecord::Line { row, .. } => *row,
        }
    }

    pub fn raw_text(&self) -> &str {
        match self {
            RawRecord::Fields { raw_text, .. } => raw_text,
            RawRecord::Line { text, .. } => text,
        }
    }
}

/// Column index → canonical field for a discovered header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    /// Position of the header row within the sheet's rows.
    pub header_index: usize,
    pub columns: Vec<Option<CanonicalField>>,
}

pub struct FieldMapper;

impl FieldMapper {
    /// First row within [`HEADER_SCAN_ROWS`] with enough recognized aliases.
    /// Duplicate columns keep their first occurrence.
    pub fn discover_header(&self, sheet: &TabularSheet) -> Option<HeaderMap> {
        sheet
            .rows
            .iter()
            .take(HEADER_SCAN_ROWS)
            .enumerate()
            .find_map(|(index, row)| {
                let mut seen = Vec::new();
                let columns: Vec<Option<CanonicalField>> = row
                    .cells
                    .iter()
                    .map(|cell| {
                        let field = CanonicalField::from_header(cell)?;
                        if seen.contains(&field) {
                            return None;
                        }
                        seen.push(field);
                        Some(field)
                    })
                    .collect();
                (seen.len() >= MIN_HEADER_MATCHES).then_some(HeaderMap {
                    header_index: index,
                    columns,
                })
            })
    }

    /// Flattens parsed input into records. Sheets without a recognizable
    /// header fall back to line heuristics over the joined cells.
    pub fn to_records(&self, input: &ParsedInput) -> Vec<RawRecord> {
        match input {
            ParsedInput::Lines(lines) => lines
                .iter()
                .map(|line| RawRecord::Line {
                    row: line.number,
                    text: line.text.clone(),
                })
                .collect(),
            ParsedInput::Rows(sheet) => match self.discover_header(sheet) {
                Some(header) => sheet
                    .rows
                    .iter()
                    .skip(header.header_index + 1)
                    .map(|row| self.map_row(&header, row))
                    .collect(),
                None => sheet
                    .rows
                    .iter()
                    .map(|row| RawRecord::Line {
                        row: row.number,
                        text: join_cells(row),
                    })
                    .collect(),
            },
        }
    }

    fn map_row(&self, header: &HeaderMap, row: &SheetRow) -> RawRecord {
        let mut fields = HashMap::new();
        for (column, value) in header.columns.iter().zip(row.cells.iter()) {
            if let Some(field) = column {
                let value = value.trim();
                if !value.is_empty() {
                    fields.insert(*field, value.to_string());
                }
            }
        }
        RawRecord::Fields {
            row: row.number,
            fields,
            raw_text: join_cells(row),
        }
    }
}

fn join_cells(row: &SheetRow) -> String {
    row.cells
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
