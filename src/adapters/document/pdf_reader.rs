//! PDF text reader backed by `pdf-extract`.

use std::panic;

use crate::domain::extraction::{DocumentFormat, ExtractionError, FlatText};
use crate::ports::DocumentTextReader;

/// Reads the text layer of a PDF, page by page.
#[derive(Debug, Clone, Default)]
pub struct PdfTextReader;

impl PdfTextReader {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn flatten(bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of returning an error.
        let text = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
            .map_err(|_| ExtractionError::parse_failure("pdf", "document structure is malformed"))?
            .map_err(|e| ExtractionError::parse_failure("pdf", e.to_string()))?;

        // Pages are separated by form feeds.
        let mut flat = FlatText::new();
        for page in text.split('\u{c}') {
            for line in page.lines() {
                flat.push_line(line);
            }
        }
        if flat.is_blank() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(flat)
    }
}

impl DocumentTextReader for PdfTextReader {
    fn read(&self, format: DocumentFormat, bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        match format {
            DocumentFormat::Pdf => Self::flatten(bytes),
            other => Err(ExtractionError::unsupported(other.extension())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_bytes_are_a_parse_failure() {
        let err = PdfTextReader::new().read(DocumentFormat::Pdf, b"%PDF-1.4 garbage").unwrap_err();
        assert!(matches!(err, ExtractionError::ParseFailure { ref format, .. } if format == "pdf"));
    }

    #[test]
    fn refuses_other_formats() {
        let err = PdfTextReader::new().read(DocumentFormat::Docx, b"PK").unwrap_err();
        assert_eq!(err, ExtractionError::unsupported("docx"));
    }
}
