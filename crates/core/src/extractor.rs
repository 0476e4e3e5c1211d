use crate::chunking::{chunk_text, ChunkingConfig};
use crate::error::IngestError;
use crate::models::{
    DocumentFormat, DocumentMetadata, ExtractionOptions, ExtractionResult, SectionType,
};
use calamine::{open_workbook_auto, Data, Reader};
use lopdf::Document;
use std::path::Path;

/// Format-aware text extraction. Each supported format turns into a raw
/// `extracted_text` blob plus section-tagged chunks; a document that fails
/// to parse yields a failure result with empty text and no chunks.
pub struct DocumentExtractor {
    options: ExtractionOptions,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(ExtractionOptions::default())
    }
}

impl DocumentExtractor {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn is_supported(filename: &str) -> bool {
        DocumentFormat::from_filename(filename).is_some()
    }

    /// Extraction never raises past this boundary: unsupported formats and
    /// malformed files both come back as `{success: false, error: ...}` so a
    /// bad upload cannot abort a batch.
    pub fn extract(&self, path: &Path, declared_filename: &str) -> ExtractionResult {
        let format = match DocumentFormat::from_filename(declared_filename) {
            Some(format) => format,
            None => {
                return ExtractionResult::failure(
                    IngestError::UnsupportedFormat(declared_filename.to_string()).to_string(),
                );
            }
        };

        let extracted = match format {
            DocumentFormat::Pdf => self.extract_pdf(path),
            DocumentFormat::Docx => self.extract_docx(path),
            DocumentFormat::Xlsx => self.extract_xlsx(path),
        };

        match extracted {
            Ok(result) => result,
            Err(error) => ExtractionResult::failure(error.to_string()),
        }
    }

    fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig::from(self.options)
    }

    fn extract_pdf(&self, path: &Path) -> Result<ExtractionResult, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::Parse(error.to_string()))?;
        let config = self.chunking();

        let pages = document.get_pages();
        let total_pages = pages.len();

        let mut extracted_text = String::new();
        let mut chunks = Vec::new();

        for (page_no, _page_id) in pages {
            let page_text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::Parse(error.to_string()))?;

            if page_text.trim().is_empty() {
                continue;
            }

            extracted_text.push_str(&format!("\n\n--- Page {page_no} ---\n\n"));
            extracted_text.push_str(&page_text);
            chunks.extend(chunk_text(
                &page_text,
                Some(page_no),
                SectionType::Page,
                config,
            )?);
        }

        Ok(ExtractionResult {
            success: true,
            extracted_text,
            chunks,
            metadata: DocumentMetadata {
                format: Some(DocumentFormat::Pdf),
                total_pages: Some(total_pages),
                ..Default::default()
            },
            error: None,
        })
    }

    fn extract_docx(&self, path: &Path) -> Result<ExtractionResult, IngestError> {
        let bytes = std::fs::read(path)?;
        let docx =
            docx_rs::read_docx(&bytes).map_err(|error| IngestError::Parse(error.to_string()))?;
        let config = self.chunking();

        let mut extracted_text = String::new();
        let mut chunks = Vec::new();
        let mut total_paragraphs = 0usize;
        let mut tables = Vec::new();

        // Paragraphs first in document order, then tables in document order,
        // so chunk ordering matches the reading order of each section kind.
        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(paragraph) => {
                    total_paragraphs += 1;
                    let text = paragraph_text(paragraph.as_ref());
                    if text.trim().is_empty() {
                        continue;
                    }
                    extracted_text.push_str(&text);
                    extracted_text.push_str("\n\n");
                    chunks.extend(chunk_text(&text, None, SectionType::Paragraph, config)?);
                }
                docx_rs::DocumentChild::Table(table) => tables.push(table.as_ref()),
                _ => {}
            }
        }

        let total_tables = tables.len();
        for (index, table) in tables.into_iter().enumerate() {
            let text = table_text(table);
            if text.trim().is_empty() {
                continue;
            }
            extracted_text.push_str(&format!("\n\n--- Table {} ---\n\n", index + 1));
            extracted_text.push_str(&text);
            extracted_text.push_str("\n\n");
            chunks.extend(chunk_text(&text, None, SectionType::Table, config)?);
        }

        Ok(ExtractionResult {
            success: true,
            extracted_text,
            chunks,
            metadata: DocumentMetadata {
                format: Some(DocumentFormat::Docx),
                total_paragraphs: Some(total_paragraphs),
                total_tables: Some(total_tables),
                ..Default::default()
            },
            error: None,
        })
    }

    fn extract_xlsx(&self, path: &Path) -> Result<ExtractionResult, IngestError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|error| IngestError::Parse(error.to_string()))?;
        let config = self.chunking();
        let sheet_names = workbook.sheet_names().to_vec();

        let mut extracted_text = String::new();
        let mut chunks = Vec::new();

        for sheet_name in &sheet_names {
            let range = workbook
                .worksheet_range(sheet_name)
                .map_err(|error| IngestError::Parse(error.to_string()))?;

            extracted_text.push_str(&format!("\n\n--- Sheet: {sheet_name} ---\n\n"));

            let mut rows = range.rows();
            let headers = match rows.next() {
                Some(row) => row,
                None => continue,
            };

            let header_text = format!(
                "Columns: {}",
                headers
                    .iter()
                    .map(|cell| cell_text(cell).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            extracted_text.push_str(&header_text);
            extracted_text.push_str("\n\n");
            chunks.extend(chunk_text(&header_text, None, SectionType::Headers, config)?);

            // Rows past the cap are excluded from chunking and from the raw
            // text alike; the cap bounds chunk volume for large sheets.
            for row in rows.take(self.options.sheet_row_cap) {
                let row_text = row
                    .iter()
                    .filter_map(cell_text)
                    .collect::<Vec<_>>()
                    .join(" | ");
                if row_text.trim().is_empty() {
                    continue;
                }
                extracted_text.push_str(&row_text);
                extracted_text.push('\n');
                chunks.extend(chunk_text(&row_text, None, SectionType::DataRow, config)?);
            }
        }

        Ok(ExtractionResult {
            success: true,
            extracted_text,
            chunks,
            metadata: DocumentMetadata {
                format: Some(DocumentFormat::Xlsx),
                total_sheets: Some(sheet_names.len()),
                sheet_names,
                ..Default::default()
            },
            error: None,
        })
    }
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let docx_rs::RunChild::Text(fragment) = run_child {
                    text.push_str(&fragment.text);
                }
            }
        }
    }
    text
}

fn table_text(table: &docx_rs::Table) -> String {
    let mut lines = Vec::new();
    for row in &table.rows {
        let docx_rs::TableChild::TableRow(row) = row;
        let cells = row
            .cells
            .iter()
            .map(|cell| {
                let docx_rs::TableRowChild::TableCell(cell) = cell;
                let joined = cell
                    .children
                    .iter()
                    .filter_map(|content| match content {
                        docx_rs::TableCellContent::Paragraph(paragraph) => {
                            Some(paragraph_text(paragraph))
                        }
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                joined.trim().to_string()
            })
            .collect::<Vec<_>>();
        lines.push(cells.join(" | "));
    }
    lines.join("\n")
}

fn cell_text(cell: &Data) -> Option<String> {
    let rendered = match cell {
        Data::Empty => return None,
        Data::String(value) => value.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value.to_string(),
        Data::DateTimeIso(value) => value.clone(),
        Data::DurationIso(value) => value.clone(),
        _ => return None,
    };

    if rendered.trim().is_empty() {
        None
    } else {
        Some(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn unsupported_format_is_reported_not_raised() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "plain text").unwrap();

        let result = DocumentExtractor::default().extract(&path, "notes.txt");

        assert!(!result.success);
        assert!(result
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("unsupported file format"));
        assert!(result.chunks.is_empty());
        assert!(result.extracted_text.is_empty());
    }

    #[test]
    fn malformed_pdf_becomes_failure_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken").unwrap();

        let result = DocumentExtractor::default().extract(&path, "broken.pdf");

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(result.chunks.is_empty());
    }

    #[test]
    fn malformed_xlsx_becomes_failure_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        fs::write(&path, b"not a zip archive").unwrap();

        let result = DocumentExtractor::default().extract(&path, "broken.xlsx");

        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn malformed_docx_becomes_failure_result() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip archive").unwrap();

        let result = DocumentExtractor::default().extract(&path, "broken.docx");

        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[test]
    fn supported_extension_check_matches_formats() {
        assert!(DocumentExtractor::is_supported("manual.pdf"));
        assert!(DocumentExtractor::is_supported("Minutes.DOCX"));
        assert!(DocumentExtractor::is_supported("ledger.xlsx"));
        assert!(!DocumentExtractor::is_supported("image.png"));
    }
}
