use crate::error::IndexError;
use crate::models::{Chunk, ScoredChunk};
use async_trait::async_trait;

/// Persistent store of `(id, vector, text, metadata)` entries keyed by
/// document. Entries live from `add_chunks` until the owning document is
/// deleted; search is cosine-distance nearest-neighbor, optionally scoped
/// to one document.
///
/// Concurrent reads are safe; interleaved writes for the same document must
/// be serialized by the caller.
#[async_trait]
pub trait VectorIndex {
    /// Requires `chunks.len() == vectors.len()`; a no-op when either side is
    /// empty. Repeated calls for the same document extend its entry sequence
    /// without id collisions.
    async fn add_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError>;

    /// Top-`limit` entries by ascending cosine distance. A `document_id`
    /// filter with no matching entries yields an empty result, not an error.
    async fn search(
        &self,
        query_vector: &[f32],
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError>;

    /// Removes every entry for the document. Idempotent: deleting an absent
    /// document is a no-op.
    async fn delete_document(&self, document_id: &str) -> Result<(), IndexError>;
}
