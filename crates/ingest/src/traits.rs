//! Seams between the pipeline and its providers.
//!
//! Each trait is object safe and used behind `Arc<dyn ...>`, so a pipeline can
//! mix an offline embedder with a remote store (or the reverse) without
//! generic parameters leaking into callers.

use crate::error::Result;
use async_trait::async_trait;
use context_doc_chunker::{ChunkMetadata, DocumentChunk};
use serde::{Deserialize, Serialize};

/// Everything persisted for one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Path of the source file relative to the ingest root
    pub file_id: String,

    /// Hex sha-256 of the source file bytes
    pub content_hash: String,

    pub chunk: DocumentChunk,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
    pub summary: Option<String>,
}

impl StoredChunk {
    /// Stable key for this chunk within a store
    pub fn key(&self) -> String {
        format!("{}#{}", self.file_id, self.chunk.chunk_index)
    }
}

/// Turns chunk text into a vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector returned by [`Embedder::embed`]
    fn dimension(&self) -> usize;

    fn name(&self) -> &str {
        "embedder"
    }
}

/// Produces a short description of a chunk
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `context` is the chunk's heading path joined with " > "
    async fn summarize(&self, text: &str, context: &str) -> Result<String>;
}

/// Persistence for chunks, keyed by file id
///
/// All operations must be idempotent: storing the same chunk twice leaves one
/// copy, removing an unknown file removes nothing.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn store_chunk(&self, chunk: StoredChunk) -> Result<()>;

    /// Whether the chunks held for `file_id` were built from `content_hash`
    async fn has_file_hash(&self, file_id: &str, content_hash: &str) -> Result<bool>;

    /// Drop every chunk of `file_id`, returning how many were removed
    async fn remove_file(&self, file_id: &str) -> Result<usize>;
}
