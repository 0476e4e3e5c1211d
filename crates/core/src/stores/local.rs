use crate::error::IndexError;
use crate::models::{Chunk, ChunkMetadata, ScoredChunk};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const SNAPSHOT_FILE: &str = "chunks.json";

/// One persisted chunk: its vector, its text, and the metadata handed back
/// with search hits. Lifecycle is tied to the owning document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub document_id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// File-persisted vector index: the whole entry set lives in memory behind
/// an `RwLock` and is rewritten to a JSON snapshot in the data directory on
/// every mutation. Search is brute-force cosine distance, which is plenty
/// for the per-document collections this serves.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<Vec<IndexEntry>>,
}

impl FileStore {
    /// Opens (or creates) the index under `data_dir`, loading any snapshot
    /// written by a previous process.
    pub fn open(data_dir: &Path) -> Result<Self, IndexError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SNAPSHOT_FILE);

        let entries = if path.exists() {
            let bytes = std::fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, entries: &[IndexEntry]) -> Result<(), IndexError> {
        let bytes = serde_json::to_vec(entries)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FileStore {
    async fn add_chunks(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError> {
        if chunks.is_empty() || vectors.is_empty() {
            return Ok(());
        }

        if chunks.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let mut entries = self.entries.write().expect("index lock poisoned");

        // Continue the per-document id sequence so incremental adds for the
        // same document never collide with earlier entries.
        let offset = entries
            .iter()
            .filter(|entry| entry.document_id == document_id)
            .count();

        for (position, (chunk, vector)) in chunks.iter().zip(vectors.iter()).enumerate() {
            entries.push(IndexEntry {
                id: format!("doc_{document_id}_chunk_{}", offset + position),
                document_id: document_id.to_string(),
                vector: vector.clone(),
                text: chunk.text.clone(),
                metadata: ChunkMetadata {
                    document_id: document_id.to_string(),
                    page_number: chunk.page_number,
                    section_type: chunk.section_type,
                    length: chunk.length,
                },
            });
        }

        self.persist(&entries)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        let entries = self.entries.read().expect("index lock poisoned");

        let mut hits: Vec<ScoredChunk> = entries
            .iter()
            .filter(|entry| document_id.map_or(true, |id| entry.document_id == id))
            .map(|entry| ScoredChunk {
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
                distance: cosine_distance(&entry.vector, query_vector),
            })
            .collect();

        hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), IndexError> {
        let mut entries = self.entries.write().expect("index lock poisoned");
        entries.retain(|entry| entry.document_id != document_id);
        self.persist(&entries)
    }
}

/// `1 - cosine_similarity`; lower is more similar. A zero-magnitude vector
/// has no direction, so its distance to anything is the maximum 1.0.
pub fn cosine_distance(left: &[f32], right: &[f32]) -> f64 {
    let mut dot = 0f64;
    let mut left_sq = 0f64;
    let mut right_sq = 0f64;

    for (a, b) in left.iter().zip(right.iter()) {
        dot += f64::from(*a) * f64::from(*b);
        left_sq += f64::from(*a) * f64::from(*a);
        right_sq += f64::from(*b) * f64::from(*b);
    }

    if left_sq == 0.0 || right_sq == 0.0 {
        return 1.0;
    }

    1.0 - dot / (left_sq.sqrt() * right_sq.sqrt())
}
