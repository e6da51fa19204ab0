use crate::error::Result;
use crate::traits::Summarizer;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_MAX_SUMMARY_CHARS: usize = 240;

fn sentence_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?](\s|$)").expect("valid sentence regex"))
}

/// Offline summarizer: heading path followed by the first prose sentence
#[derive(Debug, Clone, Copy)]
pub struct HeadingSummarizer {
    max_chars: usize,
}

impl HeadingSummarizer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn summarize_sync(&self, text: &str, context: &str) -> String {
        let sentence = first_sentence(text);
        let summary = match (context.is_empty(), sentence) {
            (true, None) => String::new(),
            (false, None) => context.to_string(),
            (true, Some(sentence)) => sentence,
            (false, Some(sentence)) => format!("{context}: {sentence}"),
        };
        truncate_chars(&summary, self.max_chars)
    }
}

impl Default for HeadingSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUMMARY_CHARS)
    }
}

#[async_trait]
impl Summarizer for HeadingSummarizer {
    async fn summarize(&self, text: &str, context: &str) -> Result<String> {
        Ok(self.summarize_sync(text, context))
    }
}

/// First sentence of the first prose line, skipping headings and code
fn first_sentence(text: &str) -> Option<String> {
    let mut in_fence = false;
    let prose: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            if line.starts_with("```") || line.starts_with("~~~") {
                in_fence = !in_fence;
                return false;
            }
            !in_fence && !line.is_empty() && !line.starts_with('#')
        })
        .collect();

    let paragraph = prose.first()?;
    let end = sentence_end()
        .find(paragraph)
        .map_or(paragraph.len(), |m| m.start() + 1);
    Some(paragraph[..end].to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uses_context_and_first_sentence() {
        let summary = HeadingSummarizer::default().summarize_sync(
            "## Registers\n\nThe control register resets the device. It is write-only.",
            "Device Reference > Registers",
        );
        assert_eq!(
            summary,
            "Device Reference > Registers: The control register resets the device."
        );
    }

    #[test]
    fn skips_code_blocks() {
        let text = "# API\n\n```rust\nfn a() {}\n```\n\nReads a value";
        assert_eq!(
            HeadingSummarizer::default().summarize_sync(text, ""),
            "Reads a value"
        );
    }

    #[test]
    fn falls_back_to_context_for_code_only_chunks() {
        let text = "```\nbank regs {}\n```";
        assert_eq!(
            HeadingSummarizer::default().summarize_sync(text, "Usage"),
            "Usage"
        );
    }

    #[test]
    fn truncates_long_summaries() {
        let summary = HeadingSummarizer::new(10).summarize_sync("abcdefghijklmnop", "");
        assert_eq!(summary, "abcdefghij…");
    }
}
