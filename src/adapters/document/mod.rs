//! Document adapters - format readers behind the DocumentTextReader port.
//!
//! - `PdfTextReader` - PDF text layer via pdf-extract
//! - `DocxTextReader` - Word documents via zip + quick-xml
//! - `SpreadsheetTextReader` - XLSX/XLS via calamine
//! - `FormatDispatchReader` - Routes each format to its reader

mod docx_reader;
mod pdf_reader;
mod spreadsheet_reader;

pub use docx_reader::DocxTextReader;
pub use pdf_reader::PdfTextReader;
pub use spreadsheet_reader::SpreadsheetTextReader;

use crate::domain::extraction::{DocumentFormat, ExtractionError, FlatText};
use crate::ports::DocumentTextReader;

/// The reader wired into the application: one reader per supported format.
#[derive(Debug, Clone, Default)]
pub struct FormatDispatchReader;

impl FormatDispatchReader {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentTextReader for FormatDispatchReader {
    fn read(&self, format: DocumentFormat, bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        match format {
            DocumentFormat::Pdf => PdfTextReader::flatten(bytes),
            DocumentFormat::Docx => DocxTextReader::flatten(bytes),
            DocumentFormat::Xlsx | DocumentFormat::Xls => SpreadsheetTextReader::flatten(format, bytes),
        }
    }
}
