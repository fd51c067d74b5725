// ==========================================
// Cadet Roster - Parsing adapters
// ==========================================
// Tabular: CSV / Excel → grid of cells (header row decided later)
// Document / Image: extracted text → logical lines
// Blank rows and lines are dropped; row numbers stay those of the source.
// ==========================================

use crate::domain::Blob;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::format_detector::{DocumentFormat, FormatClass, TabularFormat};
use crate::importer::importer_trait::{FileParser, TextExtractor};
use calamine::{open_workbook_auto_from_rs, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::sync::Arc;

// ==========================================
// ParsedInput - output of every adapter
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based row number in the source sheet.
    pub number: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabularSheet {
    pub rows: Vec<SheetRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// 1-based line number in the extracted text.
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Rows(TabularSheet),
    Lines(Vec<TextLine>),
}

impl ParsedInput {
    /// Number of non-blank source rows or lines.
    pub fn len(&self) -> usize {
        match self {
            ParsedInput::Rows(sheet) => sheet.rows.len(),
            ParsedInput::Lines(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits extracted text into candidate lines, skipping lines
    /// with no letters or digits (OCR noise, rulers, page breaks).
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let cleaned = line.split_whitespace().collect::<Vec<_>>().join(" ");
                cleaned
                    .chars()
                    .any(char::is_alphanumeric)
                    .then_some(TextLine {
                        number: idx + 1,
                        text: cleaned,
                    })
            })
            .collect();
        ParsedInput::Lines(lines)
    }
}

fn push_row(sheet: &mut TabularSheet, number: usize, cells: Vec<String>) {
    if cells.iter().all(|c| c.is_empty()) {
        return;
    }
    sheet.rows.push(SheetRow { number, cells });
}

// ==========================================
// CSV Parser
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, blob: &Blob) -> ImporterResult<ParsedInput> {
        let bytes = blob
            .bytes
            .strip_prefix(b"\xEF\xBB\xBF".as_slice())
            .unwrap_or(&blob.bytes);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // rows may have different lengths
            .from_reader(bytes);

        let mut sheet = TabularSheet::default();
        for (idx, result) in reader.byte_records().enumerate() {
            let record = result?;
            let cells = record
                .iter()
                .map(|field| String::from_utf8_lossy(field).trim().to_string())
                .collect();
            push_row(&mut sheet, idx + 1, cells);
        }
        Ok(ParsedInput::Rows(sheet))
    }
}

// ==========================================
// Excel Parser (xlsx / xls / ods, first sheet)
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, blob: &Blob) -> ImporterResult<ParsedInput> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(blob.bytes.clone()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("workbook has no sheets".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // first row of the used range may not be row 1
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut sheet = TabularSheet::default();
        for (idx, row) in range.rows().enumerate() {
            let cells = row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();
            push_row(&mut sheet, first_row + idx + 1, cells);
        }
        Ok(ParsedInput::Rows(sheet))
    }
}

// ==========================================
// Document Parser (PDF / DOCX / plain text)
// ==========================================
pub struct DocumentParser {
    extractor: Arc<dyn TextExtractor>,
    mime_type: &'static str,
}

impl DocumentParser {
    pub fn new(extractor: Arc<dyn TextExtractor>, format: DocumentFormat) -> Self {
        Self {
            extractor,
            mime_type: FormatClass::Document(format).mime_type(),
        }
    }
}

impl FileParser for DocumentParser {
    fn parse(&self, blob: &Blob) -> ImporterResult<ParsedInput> {
        let text = self.extractor.extract_text(&blob.bytes, self.mime_type)?;
        Ok(ParsedInput::from_text(&text))
    }
}

// ==========================================
// Image Parser (OCR)
// ==========================================
pub struct ImageParser {
    ocr: Arc<dyn TextExtractor>,
}

impl ImageParser {
    pub fn new(ocr: Arc<dyn TextExtractor>) -> Self {
        Self { ocr }
    }
}

impl FileParser for ImageParser {
    fn parse(&self, blob: &Blob) -> ImporterResult<ParsedInput> {
        let mime_type = blob
            .content_type
            .as_deref()
            .filter(|m| m.starts_with("image/"))
            .unwrap_or("image/*");
        let text = self.ocr.extract_text(&blob.bytes, mime_type)?;
        Ok(ParsedInput::from_text(&text))
    }
}

// ==========================================
// UniversalFileParser - dispatch by detected format
// ==========================================
#[derive(Clone)]
pub struct UniversalFileParser {
    document_extractor: Arc<dyn TextExtractor>,
    ocr: Arc<dyn TextExtractor>,
}

impl UniversalFileParser {
    pub fn new(document_extractor: Arc<dyn TextExtractor>, ocr: Arc<dyn TextExtractor>) -> Self {
        Self {
            document_extractor,
            ocr,
        }
    }

    pub fn parse(&self, format: FormatClass, blob: &Blob) -> ImporterResult<ParsedInput> {
        match format {
            FormatClass::Tabular(TabularFormat::Csv) => CsvParser.parse(blob),
            FormatClass::Tabular(TabularFormat::Excel) => ExcelParser.parse(blob),
            FormatClass::Document(doc) => {
                DocumentParser::new(self.document_extractor.clone(), doc).parse(blob)
            }
            FormatClass::Image => ImageParser::new(self.ocr.clone()).parse(blob),
            FormatClass::RemoteLink => Err(ImportError::InternalError(
                "remote link must be resolved before parsing".to_string(),
            )),
        }
    }
}
