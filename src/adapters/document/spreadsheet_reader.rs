//! XLSX / XLS reader backed by `calamine`.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;

use crate::domain::extraction::{DocumentFormat, ExtractionError, FlatText};
use crate::ports::DocumentTextReader;

/// Reads every sheet in workbook order; each row's non-empty cells are
/// joined by a single space.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetTextReader;

impl SpreadsheetTextReader {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn flatten(format: DocumentFormat, bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ExtractionError::parse_failure(format.extension(), e.to_string()))?;

        let mut flat = FlatText::new();
        for name in workbook.sheet_names() {
            match workbook.worksheet_range(&name) {
                Ok(range) => push_range(&mut flat, &range),
                Err(e) => {
                    tracing::debug!(sheet = %name, error = %e, "skipping unreadable sheet");
                }
            }
        }
        if flat.is_blank() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(flat)
    }
}

fn push_range(flat: &mut FlatText, range: &Range<Data>) {
    for row in range.rows() {
        flat.push_row(row.iter().map(cell_text), " ");
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

impl DocumentTextReader for SpreadsheetTextReader {
    fn read(&self, format: DocumentFormat, bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        if format.is_spreadsheet() {
            Self::flatten(format, bytes)
        } else {
            Err(ExtractionError::unsupported(format.extension()))
        }
    }
}
