//! DOCX text reader.
//!
//! A .docx file is a zip archive; the body lives in `word/document.xml`.
//! Paragraphs outside tables are emitted in document order, followed by
//! every table row with its cells joined by a tab.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

use crate::domain::extraction::{DocumentFormat, ExtractionError, FlatText};
use crate::ports::DocumentTextReader;

const BODY_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Default)]
pub struct DocxTextReader;

impl DocxTextReader {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn flatten(bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractionError::parse_failure("docx", format!("not a zip archive: {}", e)))?;
        let mut xml = String::new();
        archive
            .by_name(BODY_PART)
            .map_err(|e| ExtractionError::parse_failure("docx", format!("missing {}: {}", BODY_PART, e)))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractionError::parse_failure("docx", e.to_string()))?;

        let flat = flatten_document_xml(&xml)?;
        if flat.is_blank() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(flat)
    }
}

impl DocumentTextReader for DocxTextReader {
    fn read(&self, format: DocumentFormat, bytes: &[u8]) -> Result<FlatText, ExtractionError> {
        match format {
            DocumentFormat::Docx => Self::flatten(bytes),
            other => Err(ExtractionError::unsupported(other.extension())),
        }
    }
}

#[derive(Default)]
struct Walker {
    paragraphs: Vec<String>,
    rows: Vec<Vec<String>>,
    table_depth: usize,
    paragraph: String,
    cell: String,
    row: Vec<String>,
}

impl Walker {
    fn end_paragraph(&mut self) {
        let text = std::mem::take(&mut self.paragraph);
        if self.table_depth > 0 {
            if !self.cell.is_empty() && !text.trim().is_empty() {
                self.cell.push(' ');
            }
            self.cell.push_str(text.trim());
        } else {
            self.paragraphs.push(text);
        }
    }

    fn end_cell(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        self.row.push(cell);
    }

    fn end_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        self.rows.push(row);
    }
}

fn flatten_document_xml(xml: &str) -> Result<FlatText, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut walker = Walker::default();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" => walker.table_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.name().as_ref(), b"w:tab" | b"w:br" | b"w:cr") {
                    walker.paragraph.push(' ');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::parse_failure("docx", e.to_string()))?;
                walker.paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => walker.end_paragraph(),
                b"w:tc" => walker.end_cell(),
                b"w:tr" => walker.end_row(),
                b"w:tbl" => walker.table_depth = walker.table_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractionError::parse_failure(
                    "docx",
                    format!("malformed XML at byte {}: {}", reader.buffer_position(), e),
                ))
            }
        }
    }

    let mut flat = FlatText::new();
    for paragraph in &walker.paragraphs {
        flat.push_line(paragraph);
    }
    for row in &walker.rows {
        flat.push_row(row, "\t");
    }
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(BODY_PART, SimpleFileOptions::default()).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    fn cell(text: &str) -> String {
        format!("<w:tc>{}</w:tc>", para(text))
    }

    #[test]
    fn paragraphs_then_table_rows() {
        let body = format!(
            "{}<w:tbl><w:tr>{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>{}",
            para("Proyecto: Reserva del Bosque"),
            cell("Tipo"),
            cell("Área"),
            cell("Apartamento"),
            cell("65 m2"),
            para("Ciudad: Bogot&#225;"),
        );
        let flat = DocxTextReader::new().read(DocumentFormat::Docx, &docx(&body)).unwrap();
        assert_eq!(
            flat.lines(),
            &[
                "Proyecto: Reserva del Bosque".to_string(),
                "Ciudad: Bogotá".to_string(),
                "Tipo\tÁrea".to_string(),
                "Apartamento\t65 m2".to_string(),
            ]
        );
    }

    #[test]
    fn split_runs_join_into_one_line() {
        let body = "<w:p><w:r><w:t>Precio </w:t></w:r><w:r><w:t>desde $250.000.000</w:t></w:r></w:p>";
        let flat = DocxTextReader::new().read(DocumentFormat::Docx, &docx(body)).unwrap();
        assert_eq!(flat.lines(), &["Precio desde $250.000.000".to_string()]);
    }

    #[test]
    fn document_without_text_is_empty() {
        let err = DocxTextReader::new()
            .read(DocumentFormat::Docx, &docx("<w:p></w:p>"))
            .unwrap_err();
        assert_eq!(err, ExtractionError::EmptyDocument);
    }

    #[test]
    fn non_zip_bytes_are_a_parse_failure() {
        let err = DocxTextReader::new().read(DocumentFormat::Docx, b"plain text").unwrap_err();
        assert!(matches!(err, ExtractionError::ParseFailure { .. }));
    }
}
