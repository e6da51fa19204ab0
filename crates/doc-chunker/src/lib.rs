//! # Context Doc Chunker
//!
//! Structure-aware chunking of markdown-like documentation for semantic search
//! and retrieval.
//!
//! ## Philosophy
//!
//! A chunk should read like a piece of the document, not like a window over
//! its bytes:
//! - Code blocks are never cut; a block larger than the limit gets its own chunk
//! - Every chunk carries its section heading, repeated in each split part
//! - Lists, tables, API descriptions and grammar rules stay in one piece when
//!   they fit
//! - Malformed input degrades to a partial structure plus warnings, never a
//!   failure
//!
//! ## Architecture
//!
//! ```text
//! Raw bytes / text
//!     │
//!     ├──> Decoding (utf-8, latin-1, cp1252, iso-8859-1, lossy)
//!     │
//!     ├──> Parsing → DocumentStructure
//!     │    ├─> Code blocks first (fenced, then indented)
//!     │    ├─> Headings with parent indices
//!     │    └─> Paragraphs from the remaining lines
//!     │
//!     ├──> Pattern Detection (optional)
//!     │    └─> Lists, tables, API docs, grammar rules, definitions, links
//!     │
//!     ├──> Semantic Chunking
//!     │    ├─> Per-heading sections, split at unit boundaries
//!     │    ├─> Merge undersized sections
//!     │    └─> Sentence-aligned overlap
//!     │
//!     └──> Metadata Extraction
//!          └─> Heading path, code languages, sizes
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_doc_chunker::{parse, ChunkerConfig, MetadataExtractor, SemanticChunker};
//!
//! let text = "# Guide\n\nInstall the tool first.\n\n```bash\n./install.sh\n```\n";
//! let doc = parse(text, "guide.md");
//!
//! let chunker = SemanticChunker::new(ChunkerConfig::default()).unwrap();
//! let chunks = chunker.chunk_document(&doc);
//!
//! let extractor = MetadataExtractor::new();
//! for chunk in &chunks {
//!     let meta = extractor.extract(chunk, &doc);
//!     println!("Chunk {} at lines {}-{}: {:?}",
//!              meta.chunk_index, meta.line_start, meta.line_end, meta.heading_hierarchy);
//! }
//! assert_eq!(chunks.len(), 1);
//! ```

mod chunker;
mod config;
mod error;
mod language;
mod metadata;
mod parser;
mod patterns;
mod size;
mod types;

pub use chunker::{chunk_document, ChunkingStats, SemanticChunker};
pub use config::{ChunkerConfig, SizeMetric};
pub use error::{ChunkerError, Result};
pub use language::{
    detect_language, normalize_tag, resolve_language, score_languages, LanguageSignature,
    LANGUAGE_SIGNATURES, PLAIN_TEXT, UNKNOWN_LANGUAGE,
};
pub use metadata::MetadataExtractor;
pub use parser::{
    decode_bytes, parse, DocumentParser, ParseReport, ParseWarning, TextEncoding, DECODE_ORDER,
};
pub use patterns::{
    DetectedPatterns, ListItem, PatternDetail, PatternDetector, PatternKind, PatternMatch,
};
#[cfg(feature = "hf-tokenizer")]
pub use size::HfTokenizer;
pub use size::{EstimatedTokenizer, SizeMeasurer, Tokenizer};
pub use types::{
    ChunkMetadata, CodeBlock, DocumentChunk, DocumentStructure, Heading, Paragraph, Section,
    SectionUnit, DOCUMENT_CONTENT_HEADING,
};
