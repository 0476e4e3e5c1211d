use crate::answer::{AnswerSynthesizer, NO_MATCHES_MESSAGE};
use crate::embeddings::Embedder;
use crate::error::{IndexError, IngestError};
use crate::extractor::DocumentExtractor;
use crate::ingest::fingerprint_document;
use crate::models::{
    AnswerResult, DocumentFingerprint, ExtractionOptions, ExtractionResult, QaOptions,
};
use crate::retriever::assemble_context;
use crate::traits::VectorIndex;
use std::path::Path;

/// What ingesting one document produced. Extraction and embedding failures
/// land here as `success: false` with a reason; only index failures surface
/// as hard errors from the coordinator.
pub struct IngestOutcome {
    pub success: bool,
    pub document_id: String,
    pub fingerprint: Option<DocumentFingerprint>,
    pub extraction: ExtractionResult,
    pub chunks_indexed: usize,
    pub error: Option<String>,
}

/// Wires extractor, embedder, vector index, and synthesizer into the two
/// request flows: ingest a document, answer a question about one. Both the
/// index and the embedder are injected, so the pipeline runs against the
/// file store and hash embedder in tests and against remote backends in
/// production.
pub struct QaCoordinator<V, E>
where
    V: VectorIndex,
    E: Embedder,
{
    index: V,
    embedder: E,
    extractor: DocumentExtractor,
    synthesizer: AnswerSynthesizer,
    options: QaOptions,
}

impl<V, E> QaCoordinator<V, E>
where
    V: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(index: V, embedder: E) -> Result<Self, IngestError> {
        Self::with_options(
            index,
            embedder,
            ExtractionOptions::default(),
            QaOptions::default(),
        )
    }

    pub fn with_options(
        index: V,
        embedder: E,
        extraction: ExtractionOptions,
        options: QaOptions,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            index,
            embedder,
            extractor: DocumentExtractor::new(extraction),
            synthesizer: AnswerSynthesizer::new(options.confidence_boost)?,
            options,
        })
    }

    /// extract -> chunk -> embed -> index, strictly in that order. The
    /// extraction result is returned whole so callers can persist the raw
    /// text and chunk sequence alongside the index write.
    pub async fn ingest_document(
        &self,
        document_id: &str,
        path: &Path,
        declared_filename: &str,
    ) -> Result<IngestOutcome, IndexError> {
        let extraction = self.extractor.extract(path, declared_filename);
        if !extraction.success {
            let error = extraction.error.clone();
            return Ok(IngestOutcome {
                success: false,
                document_id: document_id.to_string(),
                fingerprint: None,
                extraction,
                chunks_indexed: 0,
                error,
            });
        }

        let fingerprint = match fingerprint_document(path, declared_filename, document_id) {
            Ok(fingerprint) => fingerprint,
            Err(error) => {
                return Ok(IngestOutcome {
                    success: false,
                    document_id: document_id.to_string(),
                    fingerprint: None,
                    extraction,
                    chunks_indexed: 0,
                    error: Some(error.to_string()),
                });
            }
        };

        let texts: Vec<String> = extraction
            .chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect();

        let vectors = match self.embedder.embed(&texts) {
            Ok(vectors) => vectors,
            Err(error) => {
                return Ok(IngestOutcome {
                    success: false,
                    document_id: document_id.to_string(),
                    fingerprint: Some(fingerprint),
                    extraction,
                    chunks_indexed: 0,
                    error: Some(error.to_string()),
                });
            }
        };

        self.index
            .add_chunks(document_id, &extraction.chunks, &vectors)
            .await?;

        let chunks_indexed = extraction.chunks.len();
        Ok(IngestOutcome {
            success: true,
            document_id: document_id.to_string(),
            fingerprint: Some(fingerprint),
            extraction,
            chunks_indexed,
            error: None,
        })
    }

    /// Embeds the question, retrieves the budgeted context, and synthesizes
    /// an extractive answer. Finding nothing relevant is a normal result
    /// with confidence zero, not an error; only the index can fail hard.
    pub async fn answer_question(
        &self,
        question: &str,
        document_id: Option<&str>,
    ) -> Result<AnswerResult, IndexError> {
        let query_vector = match self.embedder.embed_one(question) {
            Ok(vector) => vector,
            Err(error) => {
                return Ok(AnswerResult::no_answer(format!(
                    "An error occurred while processing your question: {error}"
                )));
            }
        };

        let hits = self
            .index
            .search(&query_vector, document_id, self.options.top_k)
            .await?;

        if hits.is_empty() {
            return Ok(AnswerResult::no_answer(NO_MATCHES_MESSAGE));
        }

        let context = assemble_context(&hits, &self.options);
        Ok(self.synthesizer.synthesize(question, &context))
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<(), IndexError> {
        self.index.delete_document(document_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::BELOW_THRESHOLD_MESSAGE;
    use crate::chunking::{chunk_text, ChunkingConfig};
    use crate::embeddings::HashEmbedder;
    use crate::models::{Chunk, ChunkMetadata, ScoredChunk, SectionType};
    use crate::stores::FileStore;
    use async_trait::async_trait;

    /// Index double returning canned hits, for driving the retrieval paths
    /// without a store on disk.
    #[derive(Default)]
    struct FakeIndex {
        hits: Vec<ScoredChunk>,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn add_chunks(
            &self,
            _document_id: &str,
            _chunks: &[Chunk],
            _vectors: &[Vec<f32>],
        ) -> Result<(), IndexError> {
            Ok(())
        }

        async fn search(
            &self,
            _query_vector: &[f32],
            _document_id: Option<&str>,
            _limit: usize,
        ) -> Result<Vec<ScoredChunk>, IndexError> {
            Ok(self.hits.clone())
        }

        async fn delete_document(&self, _document_id: &str) -> Result<(), IndexError> {
            Ok(())
        }
    }

    fn scored(text: &str, distance: f64) -> ScoredChunk {
        ScoredChunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                document_id: "doc-1".to_string(),
                page_number: Some(1),
                section_type: SectionType::Page,
                length: text.chars().count(),
            },
            distance,
        }
    }

    #[tokio::test]
    async fn empty_index_yields_the_no_information_message() {
        let coordinator =
            QaCoordinator::new(FakeIndex::default(), HashEmbedder::default()).unwrap();

        let result = coordinator
            .answer_question("How many pumps are installed?", Some("doc-7"))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.answer, NO_MATCHES_MESSAGE);
        assert_eq!(result.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn hits_below_threshold_yield_the_insufficient_message() {
        let index = FakeIndex {
            hits: vec![scored("some unrelated chunk of text", 0.92)],
        };
        let coordinator = QaCoordinator::new(index, HashEmbedder::default()).unwrap();

        let result = coordinator
            .answer_question("How many pumps are installed?", Some("doc-1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.answer, BELOW_THRESHOLD_MESSAGE);
        assert_eq!(result.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn relevant_hits_produce_an_extractive_answer() {
        let index = FakeIndex {
            hits: vec![
                scored("The station operates 14 pumps across both galleries", 0.2),
                scored("Maintenance windows rotate monthly", 0.4),
            ],
        };
        let coordinator = QaCoordinator::new(index, HashEmbedder::default()).unwrap();

        let result = coordinator
            .answer_question("How many pumps are installed?", Some("doc-1"))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.answer.contains("14 pumps"));
        assert_eq!(result.context_used, 2);
        assert_eq!(result.sources.len(), 2);
        assert!(result.confidence_score > 0.0 && result.confidence_score <= 1.0);
    }

    #[tokio::test]
    async fn pipeline_answers_from_a_file_backed_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let embedder = HashEmbedder::default();

        let text =
            "Paris is the capital of France. It has a population of over 2,100,000 people.";
        let chunks = chunk_text(
            text,
            None,
            SectionType::Paragraph,
            ChunkingConfig::default(),
        )
        .unwrap();
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embedder.embed(&texts).unwrap();
        store.add_chunks("doc-1", &chunks, &vectors).await.unwrap();

        // The hash embedder is a weaker geometry than a sentence model, so
        // the distance ceiling is relaxed; the mechanics under test are the
        // same.
        let options = QaOptions {
            max_distance: 1.0,
            ..QaOptions::default()
        };
        let coordinator = QaCoordinator::with_options(
            store,
            embedder,
            ExtractionOptions::default(),
            options,
        )
        .unwrap();

        let result = coordinator
            .answer_question("How many people live in Paris?", Some("doc-1"))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.answer.contains("2,100,000"));
        assert!(!result.sources.is_empty());

        // The same question scoped to an unknown document finds nothing.
        let missing = coordinator
            .answer_question("How many people live in Paris?", Some("doc-404"))
            .await
            .unwrap();
        assert!(!missing.success);
        assert_eq!(missing.answer, NO_MATCHES_MESSAGE);
    }

    #[tokio::test]
    async fn unsupported_upload_is_reported_in_the_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();

        let coordinator =
            QaCoordinator::new(FakeIndex::default(), HashEmbedder::default()).unwrap();
        let outcome = coordinator
            .ingest_document("doc-1", &path, "notes.txt")
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.chunks_indexed, 0);
        assert!(outcome
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("unsupported file format"));
    }
}
