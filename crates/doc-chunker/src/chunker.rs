use crate::config::{ChunkerConfig, SizeMetric};
use crate::error::{ChunkerError, Result};
use crate::parser::parse;
use crate::patterns::{DetectedPatterns, PatternDetector};
use crate::size::{EstimatedTokenizer, SizeMeasurer, Tokenizer};
use crate::types::{DocumentChunk, DocumentStructure, Heading, Section, SectionUnit};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Separator between a heading and its body, and between units
const UNIT_SEPARATOR: &str = "\n\n";

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?\n]\s").expect("sentence boundary regex is valid"))
}

/// Splits parsed documents into bounded, heading-aware chunks
#[derive(Debug, Clone)]
pub struct SemanticChunker {
    config: ChunkerConfig,
    measurer: SizeMeasurer,
    detector: Option<PatternDetector>,
}

/// A unit waiting in the split buffer, with its packing cost
struct PendingUnit<'a> {
    unit: SectionUnit<'a>,
    cost: usize,
}

impl SemanticChunker {
    /// Create a chunker; token sizes use [`EstimatedTokenizer`]
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        Self::with_tokenizer(config, Arc::new(EstimatedTokenizer))
    }

    /// Create a chunker measuring tokens with `tokenizer`
    pub fn with_tokenizer(config: ChunkerConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self::build(config, tokenizer))
    }

    fn build(config: ChunkerConfig, tokenizer: Arc<dyn Tokenizer>) -> Self {
        let measurer = SizeMeasurer::new(config.size_metric, tokenizer);
        let detector = config
            .pattern_aware
            .then(|| PatternDetector::new(measurer.clone()));
        Self {
            config,
            measurer,
            detector,
        }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Measurer used for every size decision
    #[must_use]
    pub const fn measurer(&self) -> &SizeMeasurer {
        &self.measurer
    }

    /// Whether split points are checked against detected patterns
    #[must_use]
    pub const fn is_pattern_aware(&self) -> bool {
        self.detector.is_some()
    }

    /// Parse `content` and chunk the result
    #[must_use]
    pub fn chunk_text(&self, content: &str, source_path: &str) -> Vec<DocumentChunk> {
        self.chunk_document(&parse(content, source_path))
    }

    /// Chunk a parsed document.
    ///
    /// Deterministic: the same structure and configuration always produce the
    /// same chunks.
    #[must_use]
    pub fn chunk_document(&self, doc: &DocumentStructure) -> Vec<DocumentChunk> {
        if doc.is_empty() {
            log::debug!("{}: nothing to chunk", doc.source_path);
            return Vec::new();
        }

        let patterns = self
            .detector
            .as_ref()
            .map(|detector| detector.analyze_document(doc));

        let sections = if doc.headings.is_empty() {
            self.flat_sections(doc, patterns.as_ref())
        } else {
            self.headed_sections(doc, patterns.as_ref())
        };
        let sections = self.merge_small_sections(sections);

        let chunks: Vec<DocumentChunk> = sections
            .into_iter()
            .enumerate()
            .map(|(chunk_index, section)| self.render_chunk(chunk_index, section))
            .collect();
        self.validate(&chunks, &doc.source_path);

        let chunks = self.apply_overlap(chunks);
        log::info!(
            "Chunked {}: {}",
            doc.source_path,
            self.stats(&chunks)
        );
        chunks
    }

    /// Documents without headings: every unit under a synthetic heading
    fn flat_sections(
        &self,
        doc: &DocumentStructure,
        patterns: Option<&DetectedPatterns>,
    ) -> Vec<Section> {
        self.fit_section(doc.whole_document_section(), patterns)
    }

    fn headed_sections(
        &self,
        doc: &DocumentStructure,
        patterns: Option<&DetectedPatterns>,
    ) -> Vec<Section> {
        let owned = (0..doc.headings.len()).filter_map(|idx| doc.own_section_for_heading(idx));

        let mut sections = Vec::new();
        for section in doc.preamble_section().into_iter().chain(owned) {
            if section.render().trim().is_empty() {
                log::debug!(
                    "{}: skipping blank section '{}' (line {})",
                    doc.source_path,
                    section.heading.text,
                    section.heading.line_number
                );
                continue;
            }
            sections.extend(self.fit_section(section, patterns));
        }
        sections
    }

    /// Keep a section whole when it fits, otherwise split it
    fn fit_section(&self, section: Section, patterns: Option<&DetectedPatterns>) -> Vec<Section> {
        if !self.should_split_section(&section) {
            return vec![section];
        }
        let parts = self.split_section(&section, patterns);
        log::debug!(
            "Split section '{}' into {} parts",
            section.heading.text,
            parts.len()
        );
        parts
    }

    fn should_split_section(&self, section: &Section) -> bool {
        self.measurer.measure(&section.render()) > self.config.max_chunk_size
    }

    fn heading_cost(&self, heading: &Heading) -> usize {
        let rendered = heading.render();
        if rendered.is_empty() {
            return 0;
        }
        self.measurer.measure(&format!("{rendered}{UNIT_SEPARATOR}"))
    }

    /// Greedy packing of a section's units in line order.
    ///
    /// Every part repeats the heading, so its cost is charged on each reset.
    /// Units larger than the limit get a part of their own.
    fn split_section(&self, section: &Section, patterns: Option<&DetectedPatterns>) -> Vec<Section> {
        let max = self.config.max_chunk_size;
        let heading_cost = self.heading_cost(&section.heading);

        let mut parts: Vec<Section> = Vec::new();
        let mut buffer: Vec<PendingUnit<'_>> = Vec::new();
        let mut size = heading_cost;

        for unit in section.units() {
            let rendered = unit.render();
            let unit_size = self.measurer.measure(&rendered);
            let cost = self.measurer.measure(&format!("{rendered}{UNIT_SEPARATOR}"));

            if unit_size > max {
                if !buffer.is_empty() {
                    parts.push(section_part(section, &buffer, !parts.is_empty()));
                    buffer.clear();
                }
                log::warn!(
                    "Unit at lines {}-{} under '{}' is {unit_size} {}, above max_chunk_size {max}; emitting it alone",
                    unit.line_start(),
                    unit.line_end(),
                    section.heading.text,
                    self.measurer.metric().as_str()
                );
                let alone = [PendingUnit { unit, cost }];
                parts.push(section_part(section, &alone, !parts.is_empty()));
                size = heading_cost;
                continue;
            }

            // `size` already holds the separators in front of `unit`
            if !buffer.is_empty() && size + unit_size > max {
                let keep = self.split_point(&buffer, &unit, unit_size, heading_cost, patterns);
                let carried = buffer.split_off(keep);
                parts.push(section_part(section, &buffer, !parts.is_empty()));
                buffer = carried;
                size = heading_cost + buffer.iter().map(|pending| pending.cost).sum::<usize>();
            }

            buffer.push(PendingUnit { unit, cost });
            size += cost;
        }

        if !buffer.is_empty() {
            parts.push(section_part(section, &buffer, !parts.is_empty()));
        }
        parts
    }

    /// Number of buffered units to flush before `next`.
    ///
    /// Normally the whole buffer. When a detected pattern spans the boundary,
    /// the split moves back to where the pattern starts, provided the carried
    /// units and `next` still fit in one part.
    fn split_point(
        &self,
        buffer: &[PendingUnit<'_>],
        next: &SectionUnit<'_>,
        next_size: usize,
        heading_cost: usize,
        patterns: Option<&DetectedPatterns>,
    ) -> usize {
        let max = self.config.max_chunk_size;
        let Some(last) = buffer.last() else {
            return 0;
        };
        let Some(pattern) = patterns
            .and_then(|p| p.protecting(last.unit.line_end(), next.line_start(), max))
        else {
            return buffer.len();
        };

        let relocated = buffer
            .iter()
            .position(|pending| pending.unit.line_end() >= pattern.line_start)
            .filter(|&idx| {
                let carried: usize = buffer[idx..].iter().map(|pending| pending.cost).sum();
                idx > 0 && heading_cost + carried + next_size <= max
            });

        match relocated {
            Some(idx) => {
                log::debug!(
                    "Moving split before {} at line {} to keep it together",
                    pattern.kind().as_str(),
                    pattern.line_start
                );
                idx
            }
            None => {
                log::debug!(
                    "Cannot keep {} at lines {}-{} together, splitting inside it",
                    pattern.kind().as_str(),
                    pattern.line_start,
                    pattern.line_end
                );
                buffer.len()
            }
        }
    }

    /// Single left-to-right pass: an undersized section absorbs the next one
    /// when the next is not a parent-level jump and the result still fits.
    fn merge_small_sections(&self, sections: Vec<Section>) -> Vec<Section> {
        let mut merged = Vec::with_capacity(sections.len());
        let mut iter = sections.into_iter().peekable();

        while let Some(mut current) = iter.next() {
            let undersized =
                self.measurer.measure(&current.render()) < self.config.min_chunk_size;
            if undersized {
                if let Some(next) = iter.peek() {
                    if can_absorb(&current, next) {
                        let mut candidate = current.clone();
                        candidate.absorb(next.clone());
                        if self.measurer.measure(&candidate.render()) <= self.config.max_chunk_size {
                            log::debug!(
                                "Merging section '{}' into '{}'",
                                next.heading.text,
                                current.heading.text
                            );
                            current = candidate;
                            iter.next();
                        }
                    }
                }
            }
            merged.push(current);
        }

        merged
    }

    fn render_chunk(&self, chunk_index: usize, section: Section) -> DocumentChunk {
        let content = section.render();
        let (line_start, line_end) = section.line_range();
        DocumentChunk {
            chunk_size: self.measurer.measure(&content),
            content,
            section,
            chunk_index,
            line_start,
            line_end,
        }
    }

    fn validate(&self, chunks: &[DocumentChunk], source_path: &str) {
        let max = self.config.max_chunk_size;
        for chunk in chunks.iter().filter(|chunk| chunk.chunk_size > max) {
            log::error!(
                "{source_path}: chunk {} (lines {}-{}) is {} {}, above max_chunk_size {max}",
                chunk.chunk_index,
                chunk.line_start,
                chunk.line_end,
                chunk.chunk_size,
                self.measurer.metric().as_str()
            );
        }
    }

    /// Prepend the tail of each chunk's predecessor
    fn apply_overlap(&self, mut chunks: Vec<DocumentChunk>) -> Vec<DocumentChunk> {
        if self.config.chunk_overlap == 0 || chunks.len() < 2 {
            return chunks;
        }

        let previous: Vec<String> = chunks[..chunks.len() - 1]
            .iter()
            .map(|chunk| chunk.content.clone())
            .collect();

        for (chunk, previous) in chunks.iter_mut().skip(1).zip(&previous) {
            let overlap = self.overlap_text(previous);
            if overlap.is_empty() {
                continue;
            }
            chunk.chunk_size += self
                .measurer
                .measure(&format!("{overlap}{UNIT_SEPARATOR}"));
            chunk.content = format!("{overlap}{UNIT_SEPARATOR}{}", chunk.content);
            if chunk.chunk_size > self.config.max_chunk_size {
                log::debug!(
                    "Chunk {} exceeds max_chunk_size only because of overlap",
                    chunk.chunk_index
                );
            }
        }

        chunks
    }

    /// Trailing slice of `previous`, starting after its first sentence
    /// boundary.
    ///
    /// When the slice holds no boundary it is used as is, even if it starts
    /// mid-word. Empty when the slice would open or close a code fence.
    fn overlap_text<'a>(&self, previous: &'a str) -> &'a str {
        let slice = self.measurer.tail(previous, self.config.chunk_overlap);
        let trimmed = sentence_boundary_re()
            .find(slice)
            .map_or(slice, |boundary| &slice[boundary.end()..])
            .trim();

        if has_unbalanced_fence(trimmed) {
            log::debug!("Dropping overlap that would split a code fence");
            return "";
        }
        trimmed
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn stats(&self, chunks: &[DocumentChunk]) -> ChunkingStats {
        let sizes = || chunks.iter().map(|chunk| chunk.chunk_size);
        let total_size: usize = sizes().sum();
        ChunkingStats {
            total_chunks: chunks.len(),
            total_lines: chunks.iter().map(DocumentChunk::line_count).sum(),
            total_size,
            avg_size: total_size.checked_div(chunks.len()).unwrap_or(0),
            min_size: sizes().min().unwrap_or(0),
            max_size: sizes().max().unwrap_or(0),
            oversized_chunks: sizes()
                .filter(|&size| size > self.config.max_chunk_size)
                .count(),
            metric: self.config.size_metric,
        }
    }
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::build(ChunkerConfig::default(), Arc::new(EstimatedTokenizer))
    }
}

/// Chunk `doc` with a one-off chunker built from `config`
pub fn chunk_document(doc: &DocumentStructure, config: ChunkerConfig) -> Result<Vec<DocumentChunk>> {
    Ok(SemanticChunker::new(config)?.chunk_document(doc))
}

fn section_part(section: &Section, units: &[PendingUnit<'_>], continued: bool) -> Section {
    let mut part = Section::new(section.heading.clone(), section.heading_index);
    part.continued = continued;
    for pending in units {
        match pending.unit {
            SectionUnit::Paragraph(paragraph) => part.paragraphs.push(paragraph.clone()),
            SectionUnit::Code(block) => part.code_blocks.push(block.clone()),
        }
    }
    part
}

/// A section never absorbs a shallower heading, and preamble text never
/// absorbs a real heading (the merged chunk would lose its hierarchy).
fn can_absorb(current: &Section, next: &Section) -> bool {
    if current.heading.is_synthetic() && !next.heading.is_synthetic() {
        return false;
    }
    next.heading.level >= current.heading.level
}

fn has_unbalanced_fence(text: &str) -> bool {
    text.matches("```").count() % 2 == 1 || text.matches("~~~").count() % 2 == 1
}

/// Statistics about chunking results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_size: usize,
    pub avg_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    /// Chunks above `max_chunk_size`
    pub oversized_chunks: usize,
    pub metric: SizeMetric,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | Size: {} {} | Avg: {} | Range: {}-{} | Oversized: {}",
            self.total_chunks,
            self.total_lines,
            self.total_size,
            self.metric.as_str(),
            self.avg_size,
            self.min_size,
            self.max_size,
            self.oversized_chunks
        )
    }
}
