//! # Context Doc Ingest
//!
//! Feeds documentation trees through the chunker and into a vector store.
//!
//! ```text
//! root/
//!   │
//!   ├──> DocumentScanner   (.gitignore aware, extension + size filter)
//!   │
//!   └──> IngestPipeline    (bounded worker pool)
//!          ├─> sha-256 of the file bytes, skip if the store has it
//!          ├─> parse → chunk → metadata   (blocking pool)
//!          ├─> Embedder (+ Summarizer when enabled)
//!          ├─> remove stale chunks
//!          └─> ChunkStore
//! ```
//!
//! Providers are traits so the same pipeline runs offline ([`StubEmbedder`],
//! [`HeadingSummarizer`], [`InMemoryChunkStore`]) or against real services.
//!
//! ```rust,no_run
//! use context_doc_ingest::{IngestConfig, IngestPipeline, InMemoryChunkStore, StubEmbedder};
//! use std::sync::Arc;
//!
//! # async fn run() -> context_doc_ingest::Result<()> {
//! let store = Arc::new(InMemoryChunkStore::new());
//! let pipeline = IngestPipeline::new(
//!     IngestConfig::default(),
//!     Arc::new(StubEmbedder::default()),
//!     store.clone(),
//! )?;
//! let stats = pipeline.ingest_dir("docs").await?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

mod config;
mod embedder;
mod error;
mod limits;
mod memory;
mod pipeline;
mod scanner;
mod stats;
mod summarizer;
mod traits;

pub use config::{IngestConfig, DEFAULT_EXTENSIONS, DEFAULT_MAX_FILE_BYTES};
pub use embedder::{cosine_similarity, StubEmbedder, DEFAULT_STUB_DIMENSION};
pub use error::{IngestError, Result};
pub use limits::{
    concurrency_from_env, default_concurrency, IngestLimiter, LimiterSnapshot, CONCURRENCY_ENV,
    MAX_INGEST_CONCURRENCY,
};
pub use memory::InMemoryChunkStore;
pub use pipeline::{content_hash, FileOutcome, IngestPipeline, ProgressSnapshot};
pub use scanner::{file_id, DocumentScanner};
pub use stats::IngestStats;
pub use summarizer::HeadingSummarizer;
pub use traits::{ChunkStore, Embedder, StoredChunk, Summarizer};
