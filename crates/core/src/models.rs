use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
}

impl DocumentFormat {
    /// Detects the declared format from a filename extension, case-insensitive.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit('.').next()?.to_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Docx => write!(f, "DOCX"),
            Self::Xlsx => write!(f, "XLSX"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Page,
    Paragraph,
    Table,
    Headers,
    DataRow,
}

/// A bounded fragment of normalized document text, the unit of embedding
/// and retrieval. Ordering within a document is positional and assigned by
/// the caller; it is never used for ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub page_number: Option<u32>,
    pub section_type: SectionType,
    pub length: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<DocumentFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_paragraphs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tables: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sheets: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sheet_names: Vec<String>,
}

/// Outcome of extracting one document. A failure leaves `extracted_text`
/// empty and `chunks` empty; chunks are never partially populated from a
/// document that failed to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub extracted_text: String,
    pub chunks: Vec<Chunk>,
    pub metadata: DocumentMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            extracted_text: String::new(),
            chunks: Vec::new(),
            metadata: DocumentMetadata::default(),
            error: Some(error.into()),
        }
    }
}

/// Metadata carried alongside every indexed chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub page_number: Option<u32>,
    pub section_type: SectionType,
    pub length: usize,
}

/// A raw nearest-neighbor hit: lower cosine distance is more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

/// A retrieved chunk admitted into the answer context. Transient; never
/// persisted.
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub similarity: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub rank: usize,
    pub text_preview: String,
    pub page_number: Option<u32>,
    pub section_type: SectionType,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub success: bool,
    pub answer: String,
    pub confidence_score: f64,
    pub sources: Vec<SourceRef>,
    pub context_used: usize,
}

impl AnswerResult {
    /// A well-formed "no answer" value with confidence zero. Not an error:
    /// failing to find relevant context is a normal outcome.
    pub fn no_answer(message: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: message.into(),
            confidence_score: 0.0,
            sources: Vec::new(),
            context_used: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub filename: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// Extraction policy knobs. The row cap bounds chunk volume for large
/// spreadsheets; rows past the cap are excluded from both chunking and the
/// raw extracted text.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionOptions {
    pub chunk_max_chars: usize,
    pub chunk_min_chars: usize,
    pub sheet_row_cap: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 500,
            chunk_min_chars: 50,
            sheet_row_cap: 100,
        }
    }
}

/// Retrieval and synthesis policy constants. These are the main tunable
/// surface of the pipeline, not derived values.
#[derive(Debug, Clone, Copy)]
pub struct QaOptions {
    /// Nearest neighbors fetched per question.
    pub top_k: usize,
    /// Cosine-distance ceiling for admitting a hit into the context.
    pub max_distance: f64,
    /// Maximum total character count of assembled context.
    pub max_context_chars: usize,
    /// Multiplier applied to mean similarity when scoring confidence,
    /// clamped to 1.0.
    pub confidence_boost: f64,
}

impl Default for QaOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_distance: 0.7,
            max_context_chars: 2_000,
            confidence_boost: 1.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_filename("Report.PDF"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_filename("minutes.Docx"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_filename("ledger.xlsx"),
            Some(DocumentFormat::Xlsx)
        );
        assert_eq!(DocumentFormat::from_filename("notes.txt"), None);
    }

    #[test]
    fn extraction_failure_carries_no_chunks() {
        let result = ExtractionResult::failure("document parse error: truncated");
        assert!(!result.success);
        assert!(result.extracted_text.is_empty());
        assert!(result.chunks.is_empty());
        assert!(result.error.is_some());
    }

    #[test]
    fn no_answer_has_zero_confidence() {
        let result = AnswerResult::no_answer("nothing relevant");
        assert!(!result.success);
        assert_eq!(result.confidence_score, 0.0);
        assert!(result.sources.is_empty());
    }
}
