use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("document parse error: {0}")]
    Parse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {actual} does not match configured {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("chunk count {chunks} does not match vector count {vectors}")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
