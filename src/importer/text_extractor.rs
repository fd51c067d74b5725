// ==========================================
// Cadet Roster - Text extraction adapters
// ==========================================
// Implementations of the TextExtractor port:
// - DocumentTextExtractor: PDF text layer, DOCX body, plain text
// - TesseractCliOcr: images through the `tesseract` executable
// - UnavailableOcr: default when no OCR engine is configured
// ==========================================

use crate::importer::error::ExtractionError;
use crate::importer::importer_trait::TextExtractor;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::{Command, Stdio};

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ==========================================
// DocumentTextExtractor
// ==========================================
pub struct DocumentTextExtractor;

impl TextExtractor for DocumentTextExtractor {
    fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        let text = match mime_type {
            PDF_MIME => extract_pdf(bytes)?,
            DOCX_MIME => extract_docx(bytes)?,
            m if m.starts_with("text/") => String::from_utf8_lossy(bytes).into_owned(),
            other => return Err(ExtractionError::Unavailable(other.to_string())),
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractionError::Failed(e.to_string())),
        Err(_) => Err(ExtractionError::Failed("malformed PDF".to_string())),
    }
}

/// Paragraph text from word/document.xml, one line per `w:p`.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Failed(format!("not a DOCX container: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Failed(format!("missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Failed(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text_run => {
                text.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Failed(format!("DOCX XML: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

// ==========================================
// TesseractCliOcr
// ==========================================
/// Runs `tesseract stdin stdout`; output quality is not guaranteed.
pub struct TesseractCliOcr {
    program: String,
    language: String,
}

impl TesseractCliOcr {
    pub fn new(program: &str, language: &str) -> Self {
        Self {
            program: program.to_string(),
            language: language.to_string(),
        }
    }
}

impl Default for TesseractCliOcr {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl TextExtractor for TesseractCliOcr {
    fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        if !mime_type.starts_with("image/") {
            return Err(ExtractionError::Unavailable(mime_type.to_string()));
        }

        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractionError::Unavailable(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(bytes)
                .map_err(|e| ExtractionError::Failed(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ExtractionError::Failed(e.to_string()))?;
        if !output.status.success() {
            return Err(ExtractionError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}

// ==========================================
// UnavailableOcr
// ==========================================
pub struct UnavailableOcr;

impl TextExtractor for UnavailableOcr {
    fn extract_text(&self, _bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        Err(ExtractionError::Unavailable(format!(
            "{} (no OCR engine configured)",
            mime_type
        )))
    }
}
