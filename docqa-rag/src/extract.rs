//! Text extraction from uploaded files.
//!
//! Extraction turns raw file bytes into ordered [`Document`]s carrying
//! `source` metadata. The declared type is derived from the file extension
//! and checked before any bytes are touched: unsupported extensions are
//! rejected with [`RagError::UnsupportedFormat`] and zero processing cost.

use std::path::Path;

use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Supported upload formats, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.pdf` — extracted page by page.
    Pdf,
    /// `.txt` — extracted as one UTF-8 document.
    Text,
    /// `.csv` — extracted row by row with `header: value` lines.
    Csv,
}

impl FileKind {
    /// Determine the file kind from a file name.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] for any extension outside
    /// `.pdf`, `.txt`, `.csv` (case-insensitive), or for a missing extension.
    pub fn from_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" => Ok(FileKind::Text),
            "csv" => Ok(FileKind::Csv),
            _ => Err(RagError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Extract text from file bytes into ordered documents.
///
/// Every returned document has non-empty text and a `source` metadata entry
/// set to `file_name`. PDF documents additionally carry `page` (1-based),
/// CSV documents carry `row` (1-based, excluding the header).
///
/// # Errors
///
/// Returns [`RagError::Extraction`] when the bytes cannot be parsed as the
/// declared format or yield no text at all.
pub fn extract(kind: FileKind, bytes: &[u8], file_name: &str) -> Result<Vec<Document>> {
    let documents = match kind {
        FileKind::Pdf => extract_pdf(bytes, file_name)?,
        FileKind::Text => extract_text(bytes, file_name),
        FileKind::Csv => extract_csv(bytes, file_name)?,
    };

    if documents.is_empty() {
        return Err(RagError::Extraction(format!(
            "no content could be extracted from '{file_name}'"
        )));
    }

    debug!(file = file_name, documents = documents.len(), "extracted upload");
    Ok(documents)
}

fn extract_text(bytes: &[u8], file_name: &str) -> Vec<Document> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![Document::new(trimmed, file_name)]
}

fn extract_pdf(bytes: &[u8], file_name: &str) -> Result<Vec<Document>> {
    let pdf = lopdf::Document::load_mem(bytes)
        .map_err(|e| RagError::Extraction(format!("failed to parse '{file_name}' as PDF: {e}")))?;

    let mut documents = Vec::new();
    for (page_number, _) in pdf.get_pages() {
        let text = pdf.extract_text(&[page_number]).map_err(|e| {
            RagError::Extraction(format!(
                "failed to extract page {page_number} of '{file_name}': {e}"
            ))
        })?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut document = Document::new(trimmed, file_name);
        document.metadata.insert("page".to_string(), page_number.to_string());
        documents.push(document);
    }
    Ok(documents)
}

fn extract_csv(bytes: &[u8], file_name: &str) -> Result<Vec<Document>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| RagError::Extraction(format!("failed to parse '{file_name}' as CSV: {e}")))?
        .clone();

    let mut documents = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            RagError::Extraction(format!("invalid CSV record in '{file_name}': {e}"))
        })?;
        let text = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| format!("{header}: {value}"))
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            continue;
        }
        let mut document = Document::new(text, file_name);
        document.metadata.insert("row".to_string(), (index + 1).to_string());
        documents.push(document);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_from_extension() {
        assert_eq!(FileKind::from_name("report.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_name("notes.txt").unwrap(), FileKind::Text);
        assert_eq!(FileKind::from_name("data.csv").unwrap(), FileKind::Csv);
    }

    #[test]
    fn rejects_unsupported_extensions() {
        assert!(matches!(
            FileKind::from_name("memo.docx"),
            Err(RagError::UnsupportedFormat(_))
        ));
        assert!(matches!(FileKind::from_name("no_extension"), Err(RagError::UnsupportedFormat(_))));
    }

    #[test]
    fn text_extraction_sets_source() {
        let docs = extract(FileKind::Text, b"hello world", "notes.txt").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "hello world");
        assert_eq!(docs[0].metadata["source"], "notes.txt");
    }

    #[test]
    fn empty_text_is_an_extraction_error() {
        assert!(matches!(
            extract(FileKind::Text, b"   \n  ", "blank.txt"),
            Err(RagError::Extraction(_))
        ));
    }

    #[test]
    fn csv_extraction_is_one_document_per_row() {
        let bytes = b"name,role\nada,engineer\ngrace,admiral\n";
        let docs = extract(FileKind::Csv, bytes, "people.csv").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "name: ada\nrole: engineer");
        assert_eq!(docs[0].metadata["row"], "1");
        assert_eq!(docs[1].metadata["row"], "2");
        assert_eq!(docs[1].metadata["source"], "people.csv");
    }
}
