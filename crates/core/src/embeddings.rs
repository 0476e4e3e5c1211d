use crate::error::EmbedError;
use serde::{Deserialize, Serialize};

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Maps text into a fixed-dimension vector space where cosine similarity is
/// meaningful. The dimension is fixed at construction; embedding the same
/// text twice with the same embedder yields the same vector.
pub trait Embedder {
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts. Empty input yields an empty output, not an
    /// error.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| EmbedError::BackendResponse {
            backend: "embedder".to_string(),
            details: "no vector returned for single input".to_string(),
        })
    }
}

/// Deterministic character-trigram embedder: trigrams are FNV-hashed into
/// buckets and the bucket counts L2-normalized. Needs no model download,
/// which also makes it the test double for the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashEmbedder {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Sentence-embedding model behind an HTTP endpoint (an Ollama-style
/// `{model, input} -> {embeddings}` contract). This is the production
/// embedder; the model itself stays a black box on the other side of the
/// wire.
pub struct RemoteEmbedder {
    endpoint: String,
    model: String,
    dimensions: usize,
    client: reqwest::blocking::Client,
}

impl RemoteEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            dimensions,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Embedder for RemoteEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let payload = tokio::task::block_in_place(|| -> Result<EmbedResponse, EmbedError> {
            let response = self.client.post(&self.endpoint).json(&request).send()?;

            if !response.status().is_success() {
                return Err(EmbedError::BackendResponse {
                    backend: "embedding-endpoint".to_string(),
                    details: response.status().to_string(),
                });
            }

            Ok(response.json()?)
        })?;

        if payload.embeddings.len() != texts.len() {
            return Err(EmbedError::BackendResponse {
                backend: "embedding-endpoint".to_string(),
                details: format!(
                    "{} vectors returned for {} inputs",
                    payload.embeddings.len(),
                    texts.len()
                ),
            });
        }

        for vector in &payload.embeddings {
            if vector.len() != self.dimensions {
                return Err(EmbedError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
        }

        Ok(payload.embeddings)
    }
}
