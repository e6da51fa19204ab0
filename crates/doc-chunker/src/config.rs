use serde::{Deserialize, Serialize};

/// Configuration for semantic document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk size in the configured metric (hard limit, except for
    /// single indivisible units)
    pub max_chunk_size: usize,

    /// Sections smaller than this are merged with the following section
    pub min_chunk_size: usize,

    /// Size of the trailing slice of a chunk repeated at the start of the next
    pub chunk_overlap: usize,

    /// Unit used for every size comparison
    pub size_metric: SizeMetric,

    /// Consult the pattern detector before committing to a split point
    pub pattern_aware: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1500,
            min_chunk_size: 100,
            chunk_overlap: 0,
            size_metric: SizeMetric::Characters,
            pattern_aware: true,
        }
    }
}

impl ChunkerConfig {
    /// Create config optimized for embeddings (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            max_chunk_size: 512,
            min_chunk_size: 64,
            chunk_overlap: 32,
            size_metric: SizeMetric::Tokens,
            ..Default::default()
        }
    }

    /// Create config optimized for LLM context (larger, comprehensive chunks)
    pub fn for_llm_context() -> Self {
        Self {
            max_chunk_size: 2048,
            min_chunk_size: 256,
            chunk_overlap: 128,
            size_metric: SizeMetric::Tokens,
            ..Default::default()
        }
    }

    /// Create config optimized for speed (no pattern analysis, no overlap)
    pub fn for_speed() -> Self {
        Self {
            chunk_overlap: 0,
            pattern_aware: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_size == 0 {
            return Err("max_chunk_size must be > 0".to_string());
        }

        if self.min_chunk_size >= self.max_chunk_size {
            return Err(format!(
                "min_chunk_size ({}) must be smaller than max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            ));
        }

        if self.chunk_overlap >= self.max_chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than max_chunk_size ({})",
                self.chunk_overlap, self.max_chunk_size
            ));
        }

        Ok(())
    }
}

/// Unit in which chunk sizes are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMetric {
    /// Number of Unicode scalar values in the rendered text
    #[default]
    Characters,

    /// Number of tokens as reported by the configured tokenizer
    Tokens,
}

impl SizeMetric {
    /// Get metric name as string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Characters => "characters",
            Self::Tokens => "tokens",
        }
    }
}
