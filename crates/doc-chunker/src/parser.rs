//! Markdown-like document parsing.
//!
//! Code blocks are extracted first so that `#` lines inside a fence are never
//! mistaken for headings. Nothing in here fails on malformed text: every
//! recoverable problem becomes a [`ParseWarning`] and parsing continues.

use crate::error::Result;
use crate::language::{self, PLAIN_TEXT};
use crate::types::{CodeBlock, DocumentStructure, Heading, Paragraph};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Maximum number of prose lines captured as a code block's preceding text
const MAX_PRECEDING_LINES: usize = 5;

/// Non-fatal problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseWarning {
    /// Document contained no text
    EmptyDocument,
    /// Bytes were not UTF-8 and were decoded with another encoding
    DecodedAs { encoding: TextEncoding },
    /// No encoding fit; invalid sequences were replaced
    LossyDecode,
    /// Heading marker run outside 1..=6
    InvalidHeadingLevel { line: usize, level: usize },
    /// Heading marker without text
    EmptyHeading { line: usize },
    /// Parent link rejected because it would create a cycle
    HeadingCycle { line: usize },
    /// Code fence never closed; the block runs to the end of the document
    UnterminatedFence { line: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDocument => write!(f, "document is empty"),
            Self::DecodedAs { encoding } => {
                write!(f, "content is not UTF-8, decoded as {}", encoding.name())
            }
            Self::LossyDecode => write!(f, "content decoded with replacement characters"),
            Self::InvalidHeadingLevel { line, level } => {
                write!(f, "line {line}: heading level {level} outside 1-6, treated as text")
            }
            Self::EmptyHeading { line } => write!(f, "line {line}: heading has no text"),
            Self::HeadingCycle { line } => {
                write!(f, "line {line}: heading parent would create a cycle")
            }
            Self::UnterminatedFence { line } => {
                write!(f, "line {line}: code fence is never closed")
            }
        }
    }
}

/// Parsed structure plus the warnings raised while building it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub structure: DocumentStructure,
    pub warnings: Vec<ParseWarning>,
}

impl ParseReport {
    /// Whether parsing finished without warnings
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Encodings tried, in order, when decoding raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Windows1252,
    Iso8859_1,
}

/// Decoding order for raw bytes
pub const DECODE_ORDER: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Latin1,
    TextEncoding::Windows1252,
    TextEncoding::Iso8859_1,
];

/// cp1252 mappings for 0x80..=0x9F; `None` marks bytes the code page leaves
/// undefined
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

impl TextEncoding {
    /// Get encoding name as string
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Windows1252 => "cp1252",
            Self::Iso8859_1 => "iso-8859-1",
        }
    }

    /// Decode `bytes`, or `None` if they are not valid in this encoding
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .ok()
                .map(|text| text.strip_prefix('\u{feff}').unwrap_or(text).to_string()),
            Self::Latin1 | Self::Iso8859_1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
                    _ => Some(char::from(b)),
                })
                .collect(),
        }
    }
}

/// Decode raw bytes with the first encoding in [`DECODE_ORDER`] that accepts
/// them, falling back to lossy UTF-8
pub fn decode_bytes(bytes: &[u8]) -> (String, Option<ParseWarning>) {
    for encoding in DECODE_ORDER {
        if let Some(text) = encoding.decode(bytes) {
            let warning =
                (encoding != TextEncoding::Utf8).then_some(ParseWarning::DecodedAs { encoding });
            return (text, warning);
        }
    }
    (
        String::from_utf8_lossy(bytes).into_owned(),
        Some(ParseWarning::LossyDecode),
    )
}

/// Markdown-like document parser
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentParser;

impl DocumentParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parse text, returning the best structure that could be built
    #[must_use]
    pub fn parse(&self, content: &str, source_path: &str) -> DocumentStructure {
        self.parse_with_report(content, source_path).structure
    }

    /// Parse raw bytes, decoding them first
    #[must_use]
    pub fn parse_bytes(&self, bytes: &[u8], source_path: &str) -> ParseReport {
        let (text, decode_warning) = decode_bytes(bytes);
        let mut report = self.parse_with_report(&text, source_path);
        if let Some(warning) = decode_warning {
            log::warn!("{source_path}: {warning}");
            report.warnings.insert(0, warning);
        }
        report
    }

    /// Read and parse a file
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParseReport> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(self.parse_bytes(&bytes, &path.to_string_lossy()))
    }

    /// Parse text and collect every warning raised on the way
    #[must_use]
    pub fn parse_with_report(&self, content: &str, source_path: &str) -> ParseReport {
        let mut warnings = Vec::new();

        if content.trim().is_empty() {
            log::warn!("{source_path}: document is empty");
            let mut structure = DocumentStructure::empty(source_path);
            structure.content = content.to_string();
            return ParseReport {
                structure,
                warnings: vec![ParseWarning::EmptyDocument],
            };
        }

        let lines: Vec<&str> = content.lines().collect();
        let mut claimed = vec![false; lines.len()];

        let mut code_blocks = extract_fenced_blocks(&lines, &mut claimed, &mut warnings);
        code_blocks.extend(extract_indented_blocks(&lines, &mut claimed));
        code_blocks.sort_by_key(|block| block.line_start);
        for block in &mut code_blocks {
            block.preceding_text = preceding_text(&lines, &claimed, block.line_start);
        }

        let (mut headings, heading_lines) = extract_headings(&lines, &claimed, &mut warnings);
        link_heading_parents(&mut headings, &mut warnings);

        let paragraphs = extract_paragraphs(&lines, &claimed, &heading_lines);

        for warning in &warnings {
            log::warn!("{source_path}: {warning}");
        }
        log::debug!(
            "Parsed {source_path}: {} headings, {} paragraphs, {} code blocks",
            headings.len(),
            paragraphs.len(),
            code_blocks.len()
        );

        ParseReport {
            structure: DocumentStructure {
                source_path: source_path.to_string(),
                headings,
                paragraphs,
                code_blocks,
                content: content.to_string(),
            },
            warnings,
        }
    }
}

/// Parse text with the default parser
#[must_use]
pub fn parse(content: &str, source_path: &str) -> DocumentStructure {
    DocumentParser::new().parse(content, source_path)
}

struct Fence {
    marker: char,
    len: usize,
    info: String,
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn fence_open(line: &str) -> Option<Fence> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(Fence {
        marker,
        len,
        info: info.split_whitespace().next().unwrap_or("").to_string(),
    })
}

fn is_fence_close(line: &str, fence: &Fence) -> bool {
    if leading_spaces(line) > 3 {
        return false;
    }
    let trimmed = line.trim();
    trimmed.chars().count() >= fence.len && trimmed.chars().all(|c| c == fence.marker)
}

fn block_language(tag: &str, first_line: Option<&str>) -> String {
    let tag = language::normalize_tag(tag);
    if tag != PLAIN_TEXT {
        return tag;
    }
    first_line
        .and_then(language::language_from_version_line)
        .unwrap_or_else(|| PLAIN_TEXT.to_string())
}

fn extract_fenced_blocks(
    lines: &[&str],
    claimed: &mut [bool],
    warnings: &mut Vec<ParseWarning>,
) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(fence) = fence_open(lines[i]) else {
            i += 1;
            continue;
        };

        let close = (i + 1..lines.len()).find(|&j| is_fence_close(lines[j], &fence));
        let (body_end, block_end) = match close {
            Some(j) => (j, j),
            None => {
                warnings.push(ParseWarning::UnterminatedFence { line: i + 1 });
                (lines.len(), lines.len() - 1)
            }
        };

        let body = &lines[i + 1..body_end];
        blocks.push(CodeBlock {
            content: body.join("\n"),
            language: block_language(&fence.info, body.first().copied()),
            line_start: i + 1,
            line_end: block_end + 1,
            preceding_text: None,
        });
        claimed[i..=block_end].iter_mut().for_each(|c| *c = true);
        i = block_end + 1;
    }

    blocks
}

fn is_indented_code_line(line: &str) -> bool {
    !line.trim().is_empty() && (line.starts_with("    ") || line.starts_with('\t'))
}

fn dedent(line: &str) -> &str {
    line.strip_prefix("    ")
        .or_else(|| line.strip_prefix('\t'))
        .unwrap_or(line.trim_start())
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([-*+]|\d+[.)])\s+\S").expect("list item regex is valid"))
}

/// Whether an indented run starting at `start` continues a list item rather
/// than opening a code block
fn continues_list(lines: &[&str], start: usize) -> bool {
    lines[..start]
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| list_item_re().is_match(line) || is_indented_code_line(line))
}

fn extract_indented_blocks(lines: &[&str], claimed: &mut [bool]) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let opens_block = !claimed[i]
            && is_indented_code_line(lines[i])
            && (i == 0 || lines[i - 1].trim().is_empty())
            && !continues_list(lines, i);
        if !opens_block {
            i += 1;
            continue;
        }

        let mut end = i;
        let mut j = i + 1;
        while j < lines.len() && !claimed[j] {
            if is_indented_code_line(lines[j]) {
                end = j;
            } else if !lines[j].trim().is_empty() {
                break;
            }
            j += 1;
        }

        let body: Vec<&str> = lines[i..=end].iter().map(|line| dedent(line)).collect();
        blocks.push(CodeBlock {
            content: body.join("\n"),
            language: block_language("", body.first().copied()),
            line_start: i + 1,
            line_end: end + 1,
            preceding_text: None,
        });
        claimed[i..=end].iter_mut().for_each(|c| *c = true);
        i = end + 1;
    }

    blocks
}

/// Prose lines directly above a code block (one blank line allowed between)
fn preceding_text(lines: &[&str], claimed: &[bool], line_start: usize) -> Option<String> {
    let mut idx = line_start.checked_sub(1)?;
    if idx > 0 && lines[idx - 1].trim().is_empty() {
        idx -= 1;
    }

    let mut collected = Vec::new();
    while idx > 0 && collected.len() < MAX_PRECEDING_LINES {
        let line = lines[idx - 1];
        if claimed[idx - 1] || line.trim().is_empty() || heading_re().is_match(line) {
            break;
        }
        collected.push(line.trim());
        idx -= 1;
    }

    if collected.is_empty() {
        return None;
    }
    collected.reverse();
    Some(collected.join("\n"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^ {0,3}([#＃]+)(?:[ \t]+(.*))?$").expect("heading regex is valid")
    })
}

fn closing_hashes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+[#＃]+\s*$").expect("closing hashes regex is valid"))
}

/// Headings plus the lines that held a heading marker (valid or empty)
fn extract_headings(
    lines: &[&str],
    claimed: &[bool],
    warnings: &mut Vec<ParseWarning>,
) -> (Vec<Heading>, Vec<bool>) {
    let mut headings = Vec::new();
    let mut heading_lines = vec![false; lines.len()];

    for (idx, line) in lines.iter().enumerate() {
        if claimed[idx] {
            continue;
        }
        let Some(caps) = heading_re().captures(line) else {
            continue;
        };

        let line_number = idx + 1;
        let level = caps.get(1).map_or(0, |m| m.as_str().chars().count());
        let raw_text = caps.get(2).map_or("", |m| m.as_str());
        let text = closing_hashes_re().replace(raw_text, "");
        let text = text.trim();

        if level == 0 || level > 6 {
            warnings.push(ParseWarning::InvalidHeadingLevel {
                line: line_number,
                level,
            });
            continue;
        }
        heading_lines[idx] = true;
        if text.is_empty() || text.chars().all(|c| c == '#' || c == '＃') {
            warnings.push(ParseWarning::EmptyHeading { line: line_number });
            continue;
        }

        let level = u8::try_from(level).unwrap_or(6);
        headings.push(Heading::new(level, text, line_number));
    }

    (headings, heading_lines)
}

/// Assign parents with a level-ordered stack.
///
/// A parent must be an earlier heading whose own chain does not reach back to
/// the child; anything else is rejected with a warning.
fn link_heading_parents(headings: &mut [Heading], warnings: &mut Vec<ParseWarning>) {
    let mut stack: Vec<usize> = Vec::new();

    for idx in 0..headings.len() {
        let level = headings[idx].level;
        while stack.last().is_some_and(|&top| headings[top].level >= level) {
            stack.pop();
        }

        let parent = stack.last().copied();
        if let Some(parent_idx) = parent {
            if creates_cycle(headings, idx, parent_idx) {
                warnings.push(ParseWarning::HeadingCycle {
                    line: headings[idx].line_number,
                });
            } else {
                headings[idx].parent = Some(parent_idx);
            }
        }
        stack.push(idx);
    }
}

fn creates_cycle(headings: &[Heading], child: usize, parent: usize) -> bool {
    if parent >= child {
        return true;
    }
    let mut visited = vec![false; headings.len()];
    let mut current = Some(parent);
    while let Some(idx) = current {
        if idx == child || visited[idx] {
            return true;
        }
        visited[idx] = true;
        current = headings[idx].parent;
    }
    false
}

fn flush_paragraph(current: &mut Vec<&str>, start: usize, paragraphs: &mut Vec<Paragraph>) {
    if current.is_empty() {
        return;
    }
    paragraphs.push(Paragraph {
        content: current.join("\n"),
        line_start: start + 1,
        line_end: start + current.len(),
    });
    current.clear();
}

fn extract_paragraphs(lines: &[&str], claimed: &[bool], heading_lines: &[bool]) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0;

    for (idx, line) in lines.iter().enumerate() {
        let is_prose = !claimed[idx] && !heading_lines[idx] && !line.trim().is_empty();
        if !is_prose {
            flush_paragraph(&mut current, start, &mut paragraphs);
            continue;
        }
        if current.is_empty() {
            start = idx;
        }
        current.push(line.trim_end());
    }
    flush_paragraph(&mut current, start, &mut paragraphs);

    paragraphs
}
