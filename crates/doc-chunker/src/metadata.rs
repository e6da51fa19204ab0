use crate::language::resolve_language;
use crate::size::Tokenizer;
use crate::types::{ChunkMetadata, DocumentChunk, DocumentStructure};
use std::fmt;
use std::sync::Arc;

/// Derives retrieval metadata for chunks
#[derive(Clone, Default)]
pub struct MetadataExtractor {
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl MetadataExtractor {
    /// Extractor that leaves `token_count` unset
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extractor that fills `token_count` with `tokenizer`
    #[must_use]
    pub fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer: Some(tokenizer),
        }
    }

    /// Compute metadata for `chunk`, a chunk of `doc`
    #[must_use]
    pub fn extract(&self, chunk: &DocumentChunk, doc: &DocumentStructure) -> ChunkMetadata {
        let section = &chunk.section;
        let heading_hierarchy = match section.heading_index {
            Some(idx) if idx < doc.headings.len() => doc.heading_path(idx),
            _ => vec![section.heading.text.clone()],
        };

        let code_languages = section
            .code_blocks
            .iter()
            .map(|block| resolve_language(&block.language, &block.content))
            .collect();

        ChunkMetadata {
            source_file: doc.source_path.clone(),
            section_level: heading_hierarchy.len(),
            heading_hierarchy,
            contains_code: section.contains_code(),
            code_languages,
            chunk_index: chunk.chunk_index,
            line_start: chunk.line_start,
            line_end: chunk.line_end,
            char_count: chunk.content.chars().count(),
            token_count: self
                .tokenizer
                .as_ref()
                .map(|tokenizer| tokenizer.count(&chunk.content)),
        }
    }

    /// Metadata for every chunk, in order
    #[must_use]
    pub fn extract_all(
        &self,
        chunks: &[DocumentChunk],
        doc: &DocumentStructure,
    ) -> Vec<ChunkMetadata> {
        chunks.iter().map(|chunk| self.extract(chunk, doc)).collect()
    }
}

impl fmt::Debug for MetadataExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataExtractor")
            .field("tokenizer", &self.tokenizer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeBlock, Heading, Section};
    use pretty_assertions::assert_eq;

    fn chunk_of(section: Section, content: &str) -> DocumentChunk {
        let (line_start, line_end) = section.line_range();
        DocumentChunk {
            content: content.to_string(),
            section,
            chunk_index: 2,
            line_start,
            line_end,
            chunk_size: content.chars().count(),
        }
    }

    fn doc_with_headings() -> DocumentStructure {
        let mut child = Heading::new(2, "Install", 3);
        child.parent = Some(0);
        DocumentStructure {
            source_path: "docs/guide.md".to_string(),
            headings: vec![Heading::new(1, "Guide", 1), child],
            ..Default::default()
        }
    }

    #[test]
    fn test_hierarchy_follows_parent_chain() {
        let doc = doc_with_headings();
        let mut section = Section::new(doc.headings[1].clone(), Some(1));
        section.code_blocks.push(CodeBlock {
            content: "def main():\n    print(None)".to_string(),
            language: "text".to_string(),
            line_start: 5,
            line_end: 8,
            preceding_text: None,
        });

        let meta = MetadataExtractor::new().extract(&chunk_of(section, "## Install\n\nbody"), &doc);
        assert_eq!(meta.source_file, "docs/guide.md");
        assert_eq!(meta.heading_hierarchy, vec!["Guide", "Install"]);
        assert_eq!(meta.section_level, 2);
        assert!(meta.contains_code);
        assert_eq!(meta.code_languages.into_iter().collect::<Vec<_>>(), vec!["python"]);
        assert_eq!(meta.chunk_index, 2);
        assert_eq!((meta.line_start, meta.line_end), (3, 8));
        assert_eq!(meta.char_count, 16);
        assert_eq!(meta.token_count, None);
    }

    #[test]
    fn test_synthetic_heading_hierarchy() {
        let doc = DocumentStructure::empty("notes.txt");
        let section = Section::new(Heading::synthetic("Document Content"), None);
        let meta = MetadataExtractor::new().extract(&chunk_of(section, "text"), &doc);
        assert_eq!(meta.heading_hierarchy, vec!["Document Content"]);
        assert_eq!(meta.section_level, 1);
        assert!(!meta.contains_code);
        assert!(meta.code_languages.is_empty());
    }

    #[test]
    fn test_token_count_with_tokenizer() {
        let doc = doc_with_headings();
        let section = Section::new(doc.headings[0].clone(), Some(0));
        let extractor =
            MetadataExtractor::with_tokenizer(Arc::new(|text: &str| text.split_whitespace().count()));
        let meta = extractor.extract(&chunk_of(section, "# Guide\n\none two three"), &doc);
        assert_eq!(meta.token_count, Some(5));
    }

    #[test]
    fn test_explicit_language_kept() {
        let doc = doc_with_headings();
        let mut section = Section::new(doc.headings[0].clone(), Some(0));
        for (language, content) in [("rs", "fn a() {}"), ("unknown", "SELECT id FROM t WHERE id = 1")] {
            section.code_blocks.push(CodeBlock {
                content: content.to_string(),
                language: language.to_string(),
                line_start: 2,
                line_end: 4,
                preceding_text: None,
            });
        }
        let meta = MetadataExtractor::new().extract(&chunk_of(section, "x"), &doc);
        let languages: Vec<String> = meta.code_languages.into_iter().collect();
        assert_eq!(languages, vec!["rust", "sql"]);
    }
}
