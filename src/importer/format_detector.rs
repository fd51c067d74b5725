// ==========================================
// Cadet Roster - Format detector
// ==========================================
// Order: URL → extension → MIME → magic bytes
// No side effects; a URL only yields RemoteLink, the concrete format
// is known once the link has been resolved to a blob.
// ==========================================

use crate::domain::{Blob, ImportArtifact};
use crate::importer::error::{ImportError, ImporterResult};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Csv,
    Excel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

/// Input classification driving adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Tabular(TabularFormat),
    Document(DocumentFormat),
    Image,
    RemoteLink,
}

impl FormatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatClass::Tabular(TabularFormat::Csv) => "csv",
            FormatClass::Tabular(TabularFormat::Excel) => "excel",
            FormatClass::Document(DocumentFormat::Pdf) => "pdf",
            FormatClass::Document(DocumentFormat::Docx) => "docx",
            FormatClass::Document(DocumentFormat::PlainText) => "text",
            FormatClass::Image => "image",
            FormatClass::RemoteLink => "remote-link",
        }
    }

    /// MIME type handed to the text-extraction port.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FormatClass::Tabular(TabularFormat::Csv) => "text/csv",
            FormatClass::Tabular(TabularFormat::Excel) => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            FormatClass::Document(DocumentFormat::Pdf) => "application/pdf",
            FormatClass::Document(DocumentFormat::Docx) => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FormatClass::Document(DocumentFormat::PlainText) => "text/plain",
            FormatClass::Image => "image/*",
            FormatClass::RemoteLink => "text/uri-list",
        }
    }
}

pub struct FormatDetector;

impl FormatDetector {
    pub fn detect(&self, artifact: &ImportArtifact) -> ImporterResult<FormatClass> {
        match artifact {
            ImportArtifact::Url(raw) => self.detect_url(raw),
            ImportArtifact::Blob(blob) => self.detect_blob(blob),
        }
    }

    /// Only absolute http(s) URLs are accepted.
    pub fn detect_url(&self, raw: &str) -> ImporterResult<FormatClass> {
        match url::Url::parse(raw.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                Ok(FormatClass::RemoteLink)
            }
            _ => Err(ImportError::UnsupportedFormat(format!(
                "not an http(s) link: {}",
                raw
            ))),
        }
    }

    pub fn detect_blob(&self, blob: &Blob) -> ImporterResult<FormatClass> {
        if blob.bytes.is_empty() {
            return Err(ImportError::UnsupportedFormat(format!(
                "{} is empty",
                blob.label()
            )));
        }

        let detected = blob
            .filename
            .as_deref()
            .and_then(from_extension)
            .or_else(|| blob.content_type.as_deref().and_then(from_mime))
            .or_else(|| from_magic(&blob.bytes));

        match detected {
            Some(format) => {
                debug!(source = %blob.label(), format = format.as_str(), "format detected");
                Ok(format)
            }
            None => Err(ImportError::UnsupportedFormat(blob.label())),
        }
    }
}

fn from_extension(filename: &str) -> Option<FormatClass> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => Some(FormatClass::Tabular(TabularFormat::Csv)),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(FormatClass::Tabular(TabularFormat::Excel)),
        "pdf" => Some(FormatClass::Document(DocumentFormat::Pdf)),
        "docx" => Some(FormatClass::Document(DocumentFormat::Docx)),
        "txt" | "text" => Some(FormatClass::Document(DocumentFormat::PlainText)),
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" | "webp" => Some(FormatClass::Image),
        _ => None,
    }
}

fn from_mime(content_type: &str) -> Option<FormatClass> {
    let parsed: mime::Mime = content_type.parse().ok()?;

    if parsed.type_() == mime::IMAGE {
        return Some(FormatClass::Image);
    }
    if parsed.subtype() == mime::PDF {
        return Some(FormatClass::Document(DocumentFormat::Pdf));
    }
    if parsed.type_() == mime::TEXT {
        if parsed.subtype() == mime::CSV {
            return Some(FormatClass::Tabular(TabularFormat::Csv));
        }
        if parsed.subtype() == mime::PLAIN {
            return Some(FormatClass::Document(DocumentFormat::PlainText));
        }
        return None;
    }

    match parsed.essence_str() {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.ms-excel"
        | "application/vnd.oasis.opendocument.spreadsheet" => {
            Some(FormatClass::Tabular(TabularFormat::Excel))
        }
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(FormatClass::Document(DocumentFormat::Docx))
        }
        _ => None,
    }
}

fn from_magic(bytes: &[u8]) -> Option<FormatClass> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG: &[u8] = b"\xFF\xD8\xFF";
    const OLE: &[u8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

    if bytes.starts_with(b"%PDF") {
        return Some(FormatClass::Document(DocumentFormat::Pdf));
    }
    if bytes.starts_with(PNG) || bytes.starts_with(JPEG) || bytes.starts_with(b"GIF8") {
        return Some(FormatClass::Image);
    }
    if bytes.starts_with(OLE) {
        return Some(FormatClass::Tabular(TabularFormat::Excel));
    }
    if bytes.starts_with(b"PK\x03\x04") {
        return sniff_zip(bytes);
    }

    let text = std::str::from_utf8(bytes).ok()?;
    if looks_like_csv(text) {
        Some(FormatClass::Tabular(TabularFormat::Csv))
    } else {
        Some(FormatClass::Document(DocumentFormat::PlainText))
    }
}

/// OOXML containers are told apart by their main part.
fn sniff_zip(bytes: &[u8]) -> Option<FormatClass> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    let mut is_docx = false;
    let mut is_xlsx = false;
    for name in archive.file_names() {
        is_docx |= name == "word/document.xml";
        is_xlsx |= name == "xl/workbook.xml";
    }
    if is_xlsx {
        Some(FormatClass::Tabular(TabularFormat::Excel))
    } else if is_docx {
        Some(FormatClass::Document(DocumentFormat::Docx))
    } else {
        None
    }
}

/// At least two non-empty lines, each with the same number (≥1) of commas.
fn looks_like_csv(text: &str) -> bool {
    let mut counts = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(5)
        .map(|l| l.matches(',').count());
    let Some(first) = counts.next() else {
        return false;
    };
    let mut seen = 1;
    for count in counts {
        if count != first {
            return false;
        }
        seen += 1;
    }
    first > 0 && seen >= 2
}
