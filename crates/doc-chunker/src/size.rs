use crate::config::SizeMetric;
use std::fmt;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Counts tokens in a piece of text.
///
/// Implementations must be deterministic: the chunker compares sizes many
/// times per document and relies on identical answers for identical input.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;
}

impl<F> Tokenizer for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Offline token estimate.
///
/// Takes the larger of the Unicode word count and a chars/4 estimate, so prose
/// is counted by words and dense code or identifiers by length.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedTokenizer;

impl Tokenizer for EstimatedTokenizer {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let words = text.unicode_words().count();
        let chars = text.chars().count();
        words.max(chars.div_ceil(4))
    }
}

/// Tokenizer backed by a HuggingFace `tokenizer.json`
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenizer {
    /// Load a tokenizer definition from disk
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            crate::ChunkerError::tokenizer(format!("{}: {e}", path.display()))
        })?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl Tokenizer for HfTokenizer {
    fn count(&self, text: &str) -> usize {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                log::warn!("Tokenizer failed to encode text, using estimate: {e}");
                EstimatedTokenizer.count(text)
            }
        }
    }
}

/// Measures text in the configured [`SizeMetric`]
#[derive(Clone)]
pub struct SizeMeasurer {
    metric: SizeMetric,
    tokenizer: Arc<dyn Tokenizer>,
}

impl SizeMeasurer {
    /// Create a measurer for `metric`; `tokenizer` is only consulted for
    /// [`SizeMetric::Tokens`]
    pub fn new(metric: SizeMetric, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { metric, tokenizer }
    }

    /// Character-count measurer
    #[must_use]
    pub fn characters() -> Self {
        Self::new(SizeMetric::Characters, Arc::new(EstimatedTokenizer))
    }

    /// Token-count measurer using `tokenizer`
    pub fn tokens(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self::new(SizeMetric::Tokens, tokenizer)
    }

    /// Metric this measurer reports in
    #[must_use]
    pub const fn metric(&self) -> SizeMetric {
        self.metric
    }

    /// Size of `text`
    #[must_use]
    pub fn measure(&self, text: &str) -> usize {
        match self.metric {
            SizeMetric::Characters => text.chars().count(),
            SizeMetric::Tokens => self.tokenizer.count(text),
        }
    }

    /// Longest suffix of `text` whose size does not exceed `budget`.
    ///
    /// Character suffixes are exact. Token suffixes grow one word boundary at
    /// a time, so the result never starts mid-word.
    #[must_use]
    pub fn tail<'a>(&self, text: &'a str, budget: usize) -> &'a str {
        if budget == 0 {
            return "";
        }

        match self.metric {
            SizeMetric::Characters => {
                let total = text.chars().count();
                if total <= budget {
                    return text;
                }
                text.char_indices()
                    .nth(total - budget)
                    .map_or("", |(idx, _)| &text[idx..])
            }
            SizeMetric::Tokens => {
                let mut start = text.len();
                for (idx, _) in text.split_word_bound_indices().rev() {
                    if self.tokenizer.count(&text[idx..]) > budget {
                        break;
                    }
                    start = idx;
                }
                &text[start..]
            }
        }
    }
}

impl Default for SizeMeasurer {
    fn default() -> Self {
        Self::characters()
    }
}

impl fmt::Debug for SizeMeasurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeMeasurer")
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}
