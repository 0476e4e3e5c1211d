pub mod local;
pub mod qdrant;

pub use local::{cosine_distance, FileStore, IndexEntry};
pub use qdrant::QdrantStore;
