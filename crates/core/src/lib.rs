pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod retriever;
pub mod stores;
pub mod traits;

pub use answer::{
    classify_intent, AnswerSynthesizer, Intent, BELOW_THRESHOLD_MESSAGE, NO_MATCHES_MESSAGE,
};
pub use chunking::{chunk_text, normalize_whitespace, ChunkingConfig};
pub use embeddings::{Embedder, HashEmbedder, RemoteEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbedError, IndexError, IngestError};
pub use extractor::DocumentExtractor;
pub use ingest::{
    derive_document_id, digest_file, discover_documents, extract_folder_best_effort,
    fingerprint_document, ExtractionBatch, SkippedDocument,
};
pub use models::{
    AnswerResult, Chunk, ChunkMetadata, ContextItem, DocumentFingerprint, DocumentFormat,
    DocumentMetadata, ExtractionOptions, ExtractionResult, QaOptions, ScoredChunk, SectionType,
    SourceRef,
};
pub use orchestrator::{IngestOutcome, QaCoordinator};
pub use retriever::assemble_context;
pub use stores::{cosine_distance, FileStore, IndexEntry, QdrantStore};
pub use traits::VectorIndex;
