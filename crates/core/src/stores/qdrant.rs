use crate::error::IndexError;
use crate::models::{Chunk, ChunkMetadata, ScoredChunk, SectionType};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

/// Qdrant-backed vector index over its REST API. The collection is created
/// with cosine distance; qdrant reports cosine *similarity* as `score`, so
/// hits are converted back to distance as `1 - score`.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    /// Creates the collection if it does not exist yet; an already-existing
    /// collection is not an error.
    pub async fn ensure_collection(&self) -> Result<(), IndexError> {
        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::CONFLICT {
            Ok(())
        } else {
            Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            })
        }
    }

    async fn document_entry_count(&self, document_id: &str) -> Result<usize, IndexError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/count",
                self.endpoint, self.collection
            ))
            .json(&json!({ "filter": document_filter(document_id), "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize)
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
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

        let offset = self.document_entry_count(document_id).await?;

        let points = chunks
            .iter()
            .zip(vectors.iter())
            .enumerate()
            .map(|(position, (chunk, vector))| {
                if vector.len() != self.vector_size {
                    return Err(IndexError::DimensionMismatch {
                        expected: self.vector_size,
                        actual: vector.len(),
                    });
                }

                let payload = json!({
                    "chunk_id": format!("doc_{document_id}_chunk_{}", offset + position),
                    "document_id": document_id,
                    "page_number": chunk.page_number,
                    "section_type": chunk.section_type,
                    "length": chunk.length,
                    "text": chunk.text,
                });

                Ok(json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": vector,
                    "payload": payload,
                }))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        document_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if query_vector.len() != self.vector_size {
            return Err(IndexError::DimensionMismatch {
                expected: self.vector_size,
                actual: query_vector.len(),
            });
        }

        let mut request = json!({
            "vector": query_vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(document_id) = document_id {
            request["filter"] = document_filter(document_id);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
            let text = hit
                .pointer("/payload/text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let document_id = hit
                .pointer("/payload/document_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let page_number = hit
                .pointer("/payload/page_number")
                .and_then(Value::as_u64)
                .map(|page| page as u32);
            let section_type = hit
                .pointer("/payload/section_type")
                .cloned()
                .map(serde_json::from_value)
                .and_then(|parsed| parsed.ok())
                .unwrap_or(SectionType::Paragraph);
            let length = hit
                .pointer("/payload/length")
                .and_then(Value::as_u64)
                .unwrap_or(text.chars().count() as u64) as usize;

            result.push(ScoredChunk {
                text,
                metadata: ChunkMetadata {
                    document_id,
                    page_number,
                    section_type,
                    length,
                },
                distance: 1.0 - score,
            });
        }

        Ok(result)
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), IndexError> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "filter": document_filter(document_id) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}

fn document_filter(document_id: &str) -> Value {
    json!({
        "must": [
            { "key": "document_id", "match": { "value": document_id } }
        ]
    })
}
