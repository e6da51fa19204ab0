//! Detection of structures that read badly when cut in half.
//!
//! The detector never changes chunk contents. It only answers, for a candidate
//! split point, whether some list, table, API description, grammar rule or
//! definition block would be torn apart by splitting there.

use crate::size::SizeMeasurer;
use crate::types::{CodeBlock, DocumentStructure, Paragraph};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Category of a detected structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    List,
    ApiDoc,
    GrammarRule,
    Definition,
    Table,
    CrossReference,
}

impl PatternKind {
    /// Get kind name as string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::ApiDoc => "api_doc",
            Self::GrammarRule => "grammar_rule",
            Self::Definition => "definition",
            Self::Table => "table",
            Self::CrossReference => "cross_reference",
        }
    }
}

/// One item of a list block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
    pub line: usize,
    /// 0 for top-level items
    pub nesting_level: usize,
    pub ordered: bool,
}

/// What was found, with the fields that matter for that category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternDetail {
    List {
        items: Vec<ListItem>,
        /// Prose line introducing the list
        parent_context: Option<String>,
    },
    ApiDoc {
        signature: String,
        description: String,
        language: String,
    },
    GrammarRule {
        name: String,
        definition: String,
        examples: Vec<String>,
    },
    Definition {
        entries: Vec<(String, String)>,
    },
    Table {
        rows: usize,
        html: bool,
    },
    CrossReference {
        text: String,
        target: String,
    },
}

impl PatternDetail {
    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        match self {
            Self::List { .. } => PatternKind::List,
            Self::ApiDoc { .. } => PatternKind::ApiDoc,
            Self::GrammarRule { .. } => PatternKind::GrammarRule,
            Self::Definition { .. } => PatternKind::Definition,
            Self::Table { .. } => PatternKind::Table,
            Self::CrossReference { .. } => PatternKind::CrossReference,
        }
    }
}

/// A detected occurrence and the lines it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// First line (1-indexed)
    pub line_start: usize,
    /// Last line (1-indexed, inclusive)
    pub line_end: usize,
    /// Size of the covered text in the detector's metric
    pub size: usize,
    pub detail: PatternDetail,
}

impl PatternMatch {
    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        self.detail.kind()
    }

    /// Whether the occurrence covers every line from `line_start` to `line_end`
    #[must_use]
    pub const fn spans(&self, line_start: usize, line_end: usize) -> bool {
        self.line_start <= line_start && self.line_end >= line_end
    }
}

/// Occurrences grouped by category, each group in line order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPatterns {
    by_kind: BTreeMap<PatternKind, Vec<PatternMatch>>,
}

impl DetectedPatterns {
    fn push(&mut self, occurrence: PatternMatch) {
        self.by_kind
            .entry(occurrence.kind())
            .or_default()
            .push(occurrence);
    }

    /// Occurrences of one category
    #[must_use]
    pub fn get(&self, kind: PatternKind) -> &[PatternMatch] {
        self.by_kind
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All occurrences, grouped by category
    pub fn iter(&self) -> impl Iterator<Item = &PatternMatch> {
        self.by_kind.values().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of occurrences per category
    #[must_use]
    pub fn counts(&self) -> BTreeMap<PatternKind, usize> {
        self.by_kind
            .iter()
            .map(|(kind, matches)| (*kind, matches.len()))
            .collect()
    }

    /// Whether splitting between `line_start` and `line_end` would cut an
    /// occurrence small enough to fit in one chunk of `max_size`
    #[must_use]
    pub fn should_keep_together(&self, line_start: usize, line_end: usize, max_size: usize) -> bool {
        self.protecting(line_start, line_end, max_size).is_some()
    }

    /// Earliest-starting occurrence that spans `line_start..=line_end` and is
    /// smaller than `max_size`
    #[must_use]
    pub fn protecting(
        &self,
        line_start: usize,
        line_end: usize,
        max_size: usize,
    ) -> Option<&PatternMatch> {
        self.iter()
            .filter(|m| m.spans(line_start, line_end) && m.size < max_size)
            .min_by_key(|m| (m.line_start, m.line_end))
    }
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([ \t]*)([-*+]|\d+[.)])[ \t]+(\S.*)$").expect("list item regex is valid")
    })
}

fn signature_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*(?:(?:pub(?:\([\w:]+\))?|export|public|private|protected|static|async|unsafe|const|virtual|abstract)\s+)*",
            r"(?:(?:fn|def|function|func|class|struct|trait|interface|enum|impl|type|module)\b",
            r"|[\w:<>\[\],*&]+\s+\**\w+\s*\()"
        ))
        .expect("signature regex is valid")
    })
}

fn grammar_rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*<?([A-Za-z_][\w-]*)>?\s*::=\s*(.*)$").expect("grammar regex is valid")
    })
}

fn definition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z`*_][\w .()/'`*-]{0,39}?)\s*(?::\s|\s-\s)\s*(\S.*)$")
            .expect("definition regex is valid")
    })
}

fn table_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(\|\s*:?-{3,}:?\s*)+\|?\s*$")
            .expect("table separator regex is valid")
    })
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\[([^\]]+)\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).expect("link regex is valid")
    })
}

fn html_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
            .expect("html link regex is valid")
    })
}

const MAX_DEFINITION_TERM_WORDS: usize = 5;

/// Finds keep-together structures in a document
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    measurer: SizeMeasurer,
}

impl PatternDetector {
    /// Detector reporting occurrence sizes with `measurer`
    #[must_use]
    pub const fn new(measurer: SizeMeasurer) -> Self {
        Self { measurer }
    }

    /// Analyze a parsed document
    #[must_use]
    pub fn analyze_document(&self, doc: &DocumentStructure) -> DetectedPatterns {
        self.analyze(&doc.content, &doc.paragraphs, &doc.code_blocks)
    }

    /// Scan `content` for every pattern category.
    ///
    /// Lines inside `code_blocks` are ignored except for API documentation,
    /// which pairs a code block with the paragraph above it.
    #[must_use]
    pub fn analyze(
        &self,
        content: &str,
        paragraphs: &[Paragraph],
        code_blocks: &[CodeBlock],
    ) -> DetectedPatterns {
        let lines: Vec<&str> = content.lines().collect();
        let mut in_code = vec![false; lines.len()];
        for block in code_blocks {
            let start = block.line_start.saturating_sub(1);
            let end = block.line_end.min(lines.len());
            if start < end {
                in_code[start..end].iter_mut().for_each(|c| *c = true);
            }
        }

        let scan = LineScan {
            lines: &lines,
            in_code: &in_code,
            measurer: &self.measurer,
        };

        let mut patterns = DetectedPatterns::default();
        scan.lists(&mut patterns);
        self.api_docs(paragraphs, code_blocks, &mut patterns);
        scan.grammar_rules(&mut patterns);
        scan.definitions(&mut patterns);
        scan.tables(&mut patterns);
        scan.cross_references(&mut patterns);

        log::debug!("Detected patterns: {:?}", patterns.counts());
        patterns
    }

    fn api_docs(
        &self,
        paragraphs: &[Paragraph],
        code_blocks: &[CodeBlock],
        patterns: &mut DetectedPatterns,
    ) {
        for block in code_blocks {
            let Some(description) = block.preceding_text.as_deref() else {
                continue;
            };
            let Some(signature) = block.content.lines().find(|line| !line.trim().is_empty())
            else {
                continue;
            };
            if !signature_re().is_match(signature) {
                continue;
            }

            let line_start = paragraphs
                .iter()
                .rev()
                .find(|p| p.line_end < block.line_start && p.line_end + 2 >= block.line_start)
                .map_or(block.line_start, |p| p.line_start);
            let size = self
                .measurer
                .measure(&format!("{description}\n\n{}", block.render()));

            patterns.push(PatternMatch {
                line_start,
                line_end: block.line_end,
                size,
                detail: PatternDetail::ApiDoc {
                    signature: signature.trim().to_string(),
                    description: description.to_string(),
                    language: block.language.clone(),
                },
            });
        }
    }
}

struct LineScan<'a> {
    lines: &'a [&'a str],
    in_code: &'a [bool],
    measurer: &'a SizeMeasurer,
}

impl LineScan<'_> {
    fn is_text(&self, idx: usize) -> bool {
        !self.in_code[idx]
    }

    fn is_blank(&self, idx: usize) -> bool {
        self.lines[idx].trim().is_empty()
    }

    fn is_heading(&self, idx: usize) -> bool {
        let trimmed = self.lines[idx].trim_start();
        trimmed.starts_with('#') || trimmed.starts_with('＃')
    }

    /// Size of lines `start..=end` (0-based)
    fn measure(&self, start: usize, end: usize) -> usize {
        self.measurer.measure(&self.lines[start..=end].join("\n"))
    }

    fn occurrence(&self, start: usize, end: usize, detail: PatternDetail) -> PatternMatch {
        PatternMatch {
            line_start: start + 1,
            line_end: end + 1,
            size: self.measure(start, end),
            detail,
        }
    }

    fn lists(&self, patterns: &mut DetectedPatterns) {
        let mut idx = 0;
        while idx < self.lines.len() {
            if !self.is_text(idx) || !list_item_re().is_match(self.lines[idx]) {
                idx += 1;
                continue;
            }

            let parent_context = (idx > 0
                && self.is_text(idx - 1)
                && !self.is_blank(idx - 1)
                && !self.is_heading(idx - 1))
            .then(|| self.lines[idx - 1].trim().to_string())
            .or_else(|| {
                (idx > 1 && self.is_blank(idx - 1) && self.is_text(idx - 2) && !self.is_blank(idx - 2))
                    .then(|| self.lines[idx - 2].trim())
                    .filter(|line| line.ends_with(':'))
                    .map(str::to_string)
            });

            let mut items = Vec::new();
            let mut indents: Vec<usize> = Vec::new();
            let mut end = idx;
            let mut cursor = idx;

            while cursor < self.lines.len() && self.is_text(cursor) {
                let line = self.lines[cursor];
                if let Some(caps) = list_item_re().captures(line) {
                    let indent: usize = caps[1].chars().map(|c| if c == '\t' { 4 } else { 1 }).sum();
                    while indents.last().is_some_and(|&top| top > indent) {
                        indents.pop();
                    }
                    if indents.last() != Some(&indent) {
                        indents.push(indent);
                    }
                    items.push(ListItem {
                        text: caps[3].trim().to_string(),
                        line: cursor + 1,
                        nesting_level: indents.len() - 1,
                        ordered: caps[2].starts_with(|c: char| c.is_ascii_digit()),
                    });
                    end = cursor;
                } else if !self.is_blank(cursor) && line.starts_with([' ', '\t']) {
                    end = cursor;
                } else if self.is_blank(cursor) {
                    let next = cursor + 1;
                    let continues = next < self.lines.len()
                        && self.is_text(next)
                        && (list_item_re().is_match(self.lines[next])
                            || (!self.is_blank(next) && self.lines[next].starts_with([' ', '\t'])));
                    if !continues {
                        break;
                    }
                } else {
                    break;
                }
                cursor += 1;
            }

            patterns.push(self.occurrence(
                idx,
                end,
                PatternDetail::List {
                    items,
                    parent_context,
                },
            ));
            idx = end + 1;
        }
    }

    fn grammar_rules(&self, patterns: &mut DetectedPatterns) {
        let mut idx = 0;
        while idx < self.lines.len() {
            let caps = match self.is_text(idx).then(|| grammar_rule_re().captures(self.lines[idx])) {
                Some(Some(caps)) => caps,
                _ => {
                    idx += 1;
                    continue;
                }
            };
            let name = caps[1].to_string();
            let mut definition = caps[2].trim().to_string();
            let mut examples = Vec::new();
            let mut end = idx;

            let mut cursor = idx + 1;
            while cursor < self.lines.len() && self.is_text(cursor) {
                let line = self.lines[cursor];
                if grammar_rule_re().is_match(line) || self.is_heading(cursor) {
                    break;
                }
                if self.is_blank(cursor) {
                    // An example may follow the rule after one blank line
                    let next = cursor + 1;
                    if next < self.lines.len() && self.is_text(next) && is_example_line(self.lines[next]) {
                        cursor += 1;
                        continue;
                    }
                    break;
                }

                let trimmed = line.trim();
                if is_example_line(line) {
                    examples.push(trimmed.to_string());
                } else if trimmed.starts_with('|') || line.starts_with([' ', '\t']) {
                    definition.push(' ');
                    definition.push_str(trimmed);
                } else if !examples.is_empty() {
                    examples.push(trimmed.to_string());
                } else {
                    break;
                }
                end = cursor;
                cursor += 1;
            }

            patterns.push(self.occurrence(
                idx,
                end,
                PatternDetail::GrammarRule {
                    name,
                    definition,
                    examples,
                },
            ));
            idx = end + 1;
        }
    }

    fn definition_at(&self, idx: usize) -> Option<(String, String)> {
        if !self.is_text(idx) || self.is_heading(idx) {
            return None;
        }
        let line = self.lines[idx];
        if line.contains('|') || line.contains("::=") || list_item_re().is_match(line) {
            return None;
        }
        let caps = definition_re().captures(line.trim_end())?;
        let term = caps[1].trim();
        if term.contains("http") || term.split_whitespace().count() > MAX_DEFINITION_TERM_WORDS {
            return None;
        }
        Some((term.to_string(), caps[2].trim().to_string()))
    }

    fn definitions(&self, patterns: &mut DetectedPatterns) {
        let mut idx = 0;
        while idx < self.lines.len() {
            let Some(first) = self.definition_at(idx) else {
                idx += 1;
                continue;
            };

            let mut entries = vec![first];
            let mut end = idx;
            let mut cursor = idx + 1;
            while cursor < self.lines.len() {
                if let Some(entry) = self.definition_at(cursor) {
                    entries.push(entry);
                    end = cursor;
                    cursor += 1;
                } else if self.is_blank(cursor)
                    && cursor + 1 < self.lines.len()
                    && self.definition_at(cursor + 1).is_some()
                {
                    cursor += 1;
                } else {
                    break;
                }
            }

            patterns.push(self.occurrence(idx, end, PatternDetail::Definition { entries }));
            idx = end + 1;
        }
    }

    fn tables(&self, patterns: &mut DetectedPatterns) {
        let mut idx = 0;
        while idx < self.lines.len() {
            if !self.is_text(idx) {
                idx += 1;
                continue;
            }

            if self.lines[idx].to_ascii_lowercase().contains("<table") {
                let close = (idx..self.lines.len())
                    .take_while(|&j| self.is_text(j))
                    .find(|&j| self.lines[j].to_ascii_lowercase().contains("</table>"));
                if let Some(end) = close {
                    let rows: usize = self.lines[idx..=end]
                        .iter()
                        .map(|line| line.to_ascii_lowercase().matches("<tr").count())
                        .sum();
                    patterns.push(self.occurrence(idx, end, PatternDetail::Table { rows, html: true }));
                    idx = end + 1;
                    continue;
                }
            }

            let run_end = (idx..self.lines.len())
                .take_while(|&j| self.is_text(j) && self.lines[j].contains('|'))
                .last();
            let Some(end) = run_end else {
                idx += 1;
                continue;
            };

            let run = &self.lines[idx..=end];
            let has_separator = run.iter().any(|line| table_separator_re().is_match(line));
            let all_piped = run.iter().all(|line| line.trim_start().starts_with('|'));
            if run.len() >= 2 && (has_separator || all_piped) {
                let rows = run
                    .iter()
                    .filter(|line| !table_separator_re().is_match(line))
                    .count();
                patterns.push(self.occurrence(idx, end, PatternDetail::Table { rows, html: false }));
            }
            idx = end + 1;
        }
    }

    fn cross_references(&self, patterns: &mut DetectedPatterns) {
        for (idx, line) in self.lines.iter().enumerate() {
            if !self.is_text(idx) {
                continue;
            }
            for caps in markdown_link_re().captures_iter(line) {
                let Some(whole) = caps.get(0) else { continue };
                if line[..whole.start()].ends_with('!') {
                    continue;
                }
                patterns.push(self.occurrence(
                    idx,
                    idx,
                    PatternDetail::CrossReference {
                        text: caps[1].to_string(),
                        target: caps[2].to_string(),
                    },
                ));
            }
            for caps in html_link_re().captures_iter(line) {
                patterns.push(self.occurrence(
                    idx,
                    idx,
                    PatternDetail::CrossReference {
                        text: caps[2].to_string(),
                        target: caps[1].to_string(),
                    },
                ));
            }
        }
    }
}

fn is_example_line(line: &str) -> bool {
    let lower = line.trim_start().to_ascii_lowercase();
    lower.starts_with("example") || lower.starts_with("e.g.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn detect(text: &str) -> DetectedPatterns {
        let doc = parse(text, "test.md");
        PatternDetector::default().analyze_document(&doc)
    }

    #[test]
    fn test_list_block_with_nesting() {
        let text = "Steps to follow:\n- first\n  - nested\n- second\n\nThen:\n\n1. ordered\n";
        let patterns = detect(text);
        let lists = patterns.get(PatternKind::List);
        assert_eq!(lists.len(), 2);

        let PatternDetail::List {
            items,
            parent_context,
        } = &lists[0].detail
        else {
            panic!("expected list detail");
        };
        assert_eq!(parent_context.as_deref(), Some("Steps to follow:"));
        let levels: Vec<usize> = items.iter().map(|i| i.nesting_level).collect();
        assert_eq!(levels, vec![0, 1, 0]);
        assert!(items.iter().all(|i| !i.ordered));
        assert_eq!((lists[0].line_start, lists[0].line_end), (2, 4));

        let PatternDetail::List {
            items,
            parent_context,
        } = &lists[1].detail
        else {
            panic!("expected list detail");
        };
        assert!(items[0].ordered);
        assert_eq!(parent_context.as_deref(), Some("Then:"));
    }

    #[test]
    fn test_loose_list_spans_blank_lines() {
        let text = "- one\n\n- two\n\n- three\n\nAfter.";
        let lists = detect(text).get(PatternKind::List).to_vec();
        assert_eq!(lists.len(), 1);
        assert_eq!((lists[0].line_start, lists[0].line_end), (1, 5));
    }

    #[test]
    fn test_api_doc_pairs_description_with_signature() {
        let text = "Opens a connection to the server.\n\n```rust\npub async fn connect(addr: &str) -> Result<Conn>\n```\n";
        let patterns = detect(text);
        let api = patterns.get(PatternKind::ApiDoc);
        assert_eq!(api.len(), 1);
        assert_eq!((api[0].line_start, api[0].line_end), (1, 5));
        let PatternDetail::ApiDoc {
            signature,
            description,
            language,
        } = &api[0].detail
        else {
            panic!("expected api detail");
        };
        assert!(signature.starts_with("pub async fn connect"));
        assert_eq!(description, "Opens a connection to the server.");
        assert_eq!(language, "rust");
    }

    #[test]
    fn test_code_without_signature_is_not_api_doc() {
        let text = "Run it:\n\n```bash\ncargo test\n```\n";
        assert!(detect(text).get(PatternKind::ApiDoc).is_empty());
    }

    #[test]
    fn test_grammar_rule_with_continuation_and_example() {
        let text = "expr ::= term\n    | expr '+' term\nExample: 1 + 2\n\nOther text.";
        let rules = detect(text).get(PatternKind::GrammarRule).to_vec();
        assert_eq!(rules.len(), 1);
        let PatternDetail::GrammarRule {
            name,
            definition,
            examples,
        } = &rules[0].detail
        else {
            panic!("expected grammar detail");
        };
        assert_eq!(name, "expr");
        assert_eq!(definition, "term | expr '+' term");
        assert_eq!(examples, &vec!["Example: 1 + 2".to_string()]);
        assert_eq!(rules[0].line_end, 3);
    }

    #[test]
    fn test_definitions_group_and_skip_lists() {
        let text = "Latency: time until the first byte\nThroughput - bytes per second\n\n- Item: not a definition\n";
        let defs = detect(text).get(PatternKind::Definition).to_vec();
        assert_eq!(defs.len(), 1);
        let PatternDetail::Definition { entries } = &defs[0].detail else {
            panic!("expected definition detail");
        };
        assert_eq!(entries[0].0, "Latency");
        assert_eq!(entries[1], ("Throughput".to_string(), "bytes per second".to_string()));
    }

    #[test]
    fn test_url_is_not_definition() {
        let text = "See https://example.com for more.\n";
        assert!(detect(text).get(PatternKind::Definition).is_empty());
    }

    #[test]
    fn test_markdown_and_html_tables() {
        let text = "| a | b |\n|---|---|\n| 1 | 2 |\n\n<table>\n<tr><td>x</td></tr>\n</table>\n";
        let tables = detect(text).get(PatternKind::Table).to_vec();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].detail, PatternDetail::Table { rows: 2, html: false });
        assert_eq!((tables[1].line_start, tables[1].line_end), (5, 7));
        assert_eq!(tables[1].detail, PatternDetail::Table { rows: 1, html: true });
    }

    #[test]
    fn test_cross_references_skip_images_and_code() {
        let text = "See [guide](guide.md) and <a href=\"api.html\">API</a>.\n![logo](logo.png)\n\n```\n[x](y)\n```\n";
        let refs = detect(text).get(PatternKind::CrossReference).to_vec();
        let targets: Vec<String> = refs
            .iter()
            .map(|r| match &r.detail {
                PatternDetail::CrossReference { target, .. } => target.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(targets, vec!["guide.md", "api.html"]);
    }

    #[test]
    fn test_should_keep_together() {
        let text = "- one\n\n- two\n\n- three\n";
        let patterns = detect(text);
        assert!(patterns.should_keep_together(1, 3, 1000));
        assert!(!patterns.should_keep_together(1, 3, 5));
        assert!(!patterns.should_keep_together(5, 7, 1000));
    }

    #[test]
    fn test_empty_input() {
        let patterns = PatternDetector::default().analyze("", &[], &[]);
        assert!(patterns.is_empty());
        assert!(!patterns.should_keep_together(1, 2, 100));
    }
}
