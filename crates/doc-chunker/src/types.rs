use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Heading attached to sections of documents that have no headings at all
pub const DOCUMENT_CONTENT_HEADING: &str = "Document Content";

/// A markdown heading.
///
/// `parent` is an index into [`DocumentStructure::headings`]; it always points
/// at an earlier heading, which keeps the hierarchy acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Heading level (1-6)
    pub level: u8,

    /// Heading text without markers
    pub text: String,

    /// Line of the heading (1-indexed); 0 for synthetic headings
    pub line_number: usize,

    /// Index of the parent heading in the owning document
    pub parent: Option<usize>,
}

impl Heading {
    /// Create a heading without a parent
    pub fn new(level: u8, text: impl Into<String>, line_number: usize) -> Self {
        Self {
            level,
            text: text.into(),
            line_number,
            parent: None,
        }
    }

    /// Top-level heading that does not exist in the source text
    pub fn synthetic(text: impl Into<String>) -> Self {
        Self::new(1, text, 0)
    }

    /// Whether this heading was invented by the chunker
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.line_number == 0
    }

    /// Markdown form of the heading, empty for synthetic headings
    #[must_use]
    pub fn render(&self) -> String {
        if self.is_synthetic() {
            return String::new();
        }
        format!("{} {}", "#".repeat(usize::from(self.level)), self.text)
    }
}

/// A fenced or indented code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Code without fence markers or indentation
    pub content: String,

    /// Language tag, "text" if unknown
    pub language: String,

    /// First line of the block, fence included (1-indexed)
    pub line_start: usize,

    /// Last line of the block, fence included (1-indexed, inclusive)
    pub line_end: usize,

    /// Prose immediately above the block
    pub preceding_text: Option<String>,
}

impl CodeBlock {
    /// Render the block as a fenced code block
    #[must_use]
    pub fn render(&self) -> String {
        let fence = if self.content.contains("```") {
            "~~~~"
        } else {
            "```"
        };
        let tag = if self.language == "text" {
            ""
        } else {
            self.language.as_str()
        };
        format!("{fence}{tag}\n{}\n{fence}", self.content)
    }

    /// Get the number of source lines the block spans
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_end.saturating_sub(self.line_start) + 1
    }
}

/// A run of prose lines terminated by a blank line or a heading/code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Paragraph text, lines joined with `\n`
    pub content: String,

    /// First line (1-indexed)
    pub line_start: usize,

    /// Last line (1-indexed, inclusive)
    pub line_end: usize,
}

/// Parsed view of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Path the document was read from
    pub source_path: String,

    /// Headings in document order
    pub headings: Vec<Heading>,

    /// Paragraphs in document order
    pub paragraphs: Vec<Paragraph>,

    /// Code blocks in document order
    pub code_blocks: Vec<CodeBlock>,

    /// Original text
    pub content: String,
}

impl DocumentStructure {
    /// Structure with no content, used when nothing could be parsed
    pub fn empty(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    /// Whether the document holds neither prose nor code
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.code_blocks.is_empty()
    }

    /// Section owned by the heading at `index`, including nested subsections:
    /// everything up to the next heading of equal or lower level.
    #[must_use]
    pub fn section_for_heading(&self, index: usize) -> Option<Section> {
        let heading = self.headings.get(index)?;
        let end = self.headings[index + 1..]
            .iter()
            .find(|next| next.level <= heading.level)
            .map(|next| next.line_number);
        Some(self.collect_section(index, heading.line_number, end))
    }

    /// Section holding only the units directly under the heading at `index`,
    /// stopping at the next heading of any level.
    #[must_use]
    pub fn own_section_for_heading(&self, index: usize) -> Option<Section> {
        let heading = self.headings.get(index)?;
        let end = self.headings.get(index + 1).map(|next| next.line_number);
        Some(self.collect_section(index, heading.line_number, end))
    }

    /// Units before the first heading, under a synthetic heading
    #[must_use]
    pub fn preamble_section(&self) -> Option<Section> {
        let first = self.headings.first().map_or(usize::MAX, |h| h.line_number);
        let section = Section {
            heading: Heading::synthetic(DOCUMENT_CONTENT_HEADING),
            heading_index: None,
            paragraphs: self
                .paragraphs
                .iter()
                .filter(|p| p.line_end < first)
                .cloned()
                .collect(),
            code_blocks: self
                .code_blocks
                .iter()
                .filter(|c| c.line_end < first)
                .cloned()
                .collect(),
            continued: false,
        };
        (!section.is_empty()).then_some(section)
    }

    /// Every unit of the document under a synthetic heading
    #[must_use]
    pub fn whole_document_section(&self) -> Section {
        Section {
            heading: Heading::synthetic(DOCUMENT_CONTENT_HEADING),
            heading_index: None,
            paragraphs: self.paragraphs.clone(),
            code_blocks: self.code_blocks.clone(),
            continued: false,
        }
    }

    /// Heading texts from the root down to the heading at `index`.
    ///
    /// Parent links are followed with a visited check so a corrupted
    /// hierarchy cannot loop.
    #[must_use]
    pub fn heading_path(&self, index: usize) -> Vec<String> {
        let mut path = Vec::new();
        let mut visited = BTreeSet::new();
        let mut current = Some(index);

        while let Some(idx) = current {
            if !visited.insert(idx) {
                log::warn!(
                    "Heading hierarchy cycle detected at index {idx} in {}",
                    self.source_path
                );
                break;
            }
            let Some(heading) = self.headings.get(idx) else {
                break;
            };
            path.push(heading.text.clone());
            current = heading.parent;
        }

        path.reverse();
        path
    }

    /// Number of lines in the source text
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    fn collect_section(&self, index: usize, start: usize, end: Option<usize>) -> Section {
        let within = |line_start: usize| line_start > start && end.map_or(true, |e| line_start < e);
        Section {
            heading: self.headings[index].clone(),
            heading_index: Some(index),
            paragraphs: self
                .paragraphs
                .iter()
                .filter(|p| within(p.line_start))
                .cloned()
                .collect(),
            code_blocks: self
                .code_blocks
                .iter()
                .filter(|c| within(c.line_start))
                .cloned()
                .collect(),
            continued: false,
        }
    }
}

/// A paragraph or code block borrowed from a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionUnit<'a> {
    Paragraph(&'a Paragraph),
    Code(&'a CodeBlock),
}

impl SectionUnit<'_> {
    #[must_use]
    pub const fn line_start(&self) -> usize {
        match self {
            Self::Paragraph(p) => p.line_start,
            Self::Code(c) => c.line_start,
        }
    }

    #[must_use]
    pub const fn line_end(&self) -> usize {
        match self {
            Self::Paragraph(p) => p.line_end,
            Self::Code(c) => c.line_end,
        }
    }

    /// Text of the unit as it appears in a chunk
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Paragraph(p) => p.content.clone(),
            Self::Code(c) => c.render(),
        }
    }
}

/// Heading plus the units it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading of the section (repeated in every split part)
    pub heading: Heading,

    /// Index of `heading` in the document, `None` when synthetic
    pub heading_index: Option<usize>,

    pub paragraphs: Vec<Paragraph>,

    pub code_blocks: Vec<CodeBlock>,

    /// True for the second and later parts of a split section
    #[serde(default)]
    pub continued: bool,
}

impl Section {
    /// Empty section under `heading`
    pub fn new(heading: Heading, heading_index: Option<usize>) -> Self {
        Self {
            heading,
            heading_index,
            paragraphs: Vec::new(),
            code_blocks: Vec::new(),
            continued: false,
        }
    }

    /// Paragraphs and code blocks interleaved in line order
    #[must_use]
    pub fn units(&self) -> Vec<SectionUnit<'_>> {
        let mut units: Vec<SectionUnit<'_>> = self
            .paragraphs
            .iter()
            .map(SectionUnit::Paragraph)
            .chain(self.code_blocks.iter().map(SectionUnit::Code))
            .collect();
        units.sort_by_key(|unit| (unit.line_start(), unit.line_end()));
        units
    }

    /// Whether the section owns no units
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.code_blocks.is_empty()
    }

    /// Whether any code block belongs to the section
    #[must_use]
    pub fn contains_code(&self) -> bool {
        !self.code_blocks.is_empty()
    }

    /// Rendered units joined by blank lines, without the heading
    #[must_use]
    pub fn render_body(&self) -> String {
        self.units()
            .iter()
            .map(SectionUnit::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Heading followed by the rendered body
    #[must_use]
    pub fn render(&self) -> String {
        let heading = self.heading.render();
        let body = self.render_body();
        match (heading.is_empty(), body.is_empty()) {
            (true, _) => body,
            (false, true) => heading,
            (false, false) => format!("{heading}\n\n{body}"),
        }
    }

    /// Lines covered by the section.
    ///
    /// The heading line is included unless the section is a continuation of a
    /// split or the heading is synthetic.
    #[must_use]
    pub fn line_range(&self) -> (usize, usize) {
        let units = self.units();
        let unit_start = units.iter().map(SectionUnit::line_start).min();
        let unit_end = units.iter().map(SectionUnit::line_end).max();
        let heading_line =
            (!self.heading.is_synthetic() && !self.continued).then_some(self.heading.line_number);

        let start = match (heading_line, unit_start) {
            (Some(h), Some(u)) => h.min(u),
            (Some(h), None) => h,
            (None, Some(u)) => u,
            (None, None) => self.heading.line_number,
        };
        let end = unit_end.unwrap_or(start).max(start);
        (start, end)
    }

    /// Append the units of `other`, keeping this section's heading.
    ///
    /// A real heading of another section is kept as a line of text so the
    /// merged chunk still shows where `other` began.
    pub fn absorb(&mut self, other: Self) {
        let foreign_heading = !other.heading.is_synthetic()
            && !other.continued
            && other.heading_index != self.heading_index;
        if foreign_heading {
            let line = other.heading.line_number;
            self.paragraphs.push(Paragraph {
                content: other.heading.render(),
                line_start: line,
                line_end: line,
            });
        }
        self.paragraphs.extend(other.paragraphs);
        self.code_blocks.extend(other.code_blocks);
    }
}

/// A bounded piece of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Rendered text, including any overlap prefix
    pub content: String,

    /// Section the chunk was rendered from
    pub section: Section,

    /// Position in the document's chunk sequence (0-based)
    pub chunk_index: usize,

    /// First source line (1-indexed)
    pub line_start: usize,

    /// Last source line (1-indexed, inclusive)
    pub line_end: usize,

    /// Size of `content` in the configured metric
    pub chunk_size: usize,
}

impl DocumentChunk {
    /// Get the number of source lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_end.saturating_sub(self.line_start) + 1
    }

    /// Check if chunk covers a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.line_start && line <= self.line_end
    }
}

/// Retrieval metadata derived from a chunk and its document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source file path
    pub source_file: String,

    /// Heading texts from the document root down to the chunk's heading
    pub heading_hierarchy: Vec<String>,

    /// Depth of `heading_hierarchy`
    pub section_level: usize,

    /// Whether the chunk holds at least one code block
    pub contains_code: bool,

    /// Languages of the chunk's code blocks
    pub code_languages: BTreeSet<String>,

    pub chunk_index: usize,

    pub line_start: usize,

    pub line_end: usize,

    /// Characters in the rendered chunk
    pub char_count: usize,

    /// Tokens in the rendered chunk, when a tokenizer was supplied
    pub token_count: Option<usize>,
}
