use context_doc_chunker::{
    ChunkerConfig, DocumentParser, MetadataExtractor, ParseWarning, PatternDetector, PatternKind,
    SemanticChunker, TextEncoding,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const REFERENCE: &str = r#"# Device Reference

Overview of the register interface.

## Registers

| Name | Offset |
|------|--------|
| CTRL | 0x00   |
| STAT | 0x04   |

## API

Reads a register value from the device.

```rust
pub fn read_register(offset: u32) -> u32
```

### Grammar

bank ::= "bank" name "{" register* "}"
Example: bank regs { }

## Usage

```
dml 1.4;
device sample;
```
"#;

#[test]
fn parses_file_and_extracts_metadata() -> anyhow::Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    let path = temp.path().join("reference.md");
    std::fs::write(&path, REFERENCE)?;

    let report = DocumentParser::new().parse_file(&path)?;
    assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    let doc = report.structure;
    assert_eq!(doc.headings.len(), 5);
    assert_eq!(doc.code_blocks.len(), 2);
    assert_eq!(doc.code_blocks[1].language, "dml");

    let chunker = SemanticChunker::new(ChunkerConfig {
        max_chunk_size: 400,
        min_chunk_size: 10,
        ..ChunkerConfig::default()
    })?;
    let chunks = chunker.chunk_document(&doc);
    let extractor = MetadataExtractor::new();
    let metadata = extractor.extract_all(&chunks, &doc);

    let hierarchies: Vec<Vec<String>> = metadata
        .iter()
        .map(|meta| meta.heading_hierarchy.clone())
        .collect();
    assert_eq!(
        hierarchies,
        vec![
            vec!["Device Reference".to_string()],
            vec!["Device Reference".to_string(), "Registers".to_string()],
            vec!["Device Reference".to_string(), "API".to_string()],
            vec![
                "Device Reference".to_string(),
                "API".to_string(),
                "Grammar".to_string()
            ],
            vec!["Device Reference".to_string(), "Usage".to_string()],
        ]
    );

    let api = &metadata[2];
    assert!(api.contains_code);
    assert_eq!(api.code_languages.iter().collect::<Vec<_>>(), vec!["rust"]);
    assert_eq!(api.section_level, 2);
    assert!(metadata
        .iter()
        .all(|meta| meta.source_file.ends_with("reference.md")));
    Ok(())
}

#[test]
fn detects_reference_patterns() {
    let doc = DocumentParser::new().parse(REFERENCE, "reference.md");
    let patterns = PatternDetector::default().analyze_document(&doc);

    assert_eq!(patterns.get(PatternKind::Table).len(), 1);
    assert_eq!(patterns.get(PatternKind::ApiDoc).len(), 1);
    assert_eq!(patterns.get(PatternKind::GrammarRule).len(), 1);
    assert!(patterns.get(PatternKind::CrossReference).is_empty());
}

#[test]
fn decodes_latin1_file_with_warning() -> anyhow::Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    let path = temp.path().join("legacy.md");
    // "# Café\n\nCrème brûlée." in latin-1
    let mut bytes = b"# Caf\xe9\n\nCr\xe8me br\xfbl\xe9e.".to_vec();
    bytes.push(b'\n');
    std::fs::write(&path, &bytes)?;

    let report = DocumentParser::new().parse_file(&path)?;
    assert_eq!(
        report.warnings,
        vec![ParseWarning::DecodedAs {
            encoding: TextEncoding::Latin1
        }]
    );
    assert_eq!(report.structure.headings[0].text, "Café");
    assert_eq!(report.structure.paragraphs[0].content, "Crème brûlée.");
    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    let temp = TempDir::new().expect("tempdir");
    let result = DocumentParser::new().parse_file(temp.path().join("absent.md"));
    assert!(result.is_err());
}

#[test]
fn malformed_document_still_chunks() {
    init_logger();
    let text = "####### not a heading\n\n#\n\n## Real\n\nBody text.\n\n```python\ndef open():\n    pass\n";
    let report = DocumentParser::new().parse_with_report(text, "broken.md");
    assert_eq!(report.warnings.len(), 3);

    let chunks = SemanticChunker::default().chunk_document(&report.structure);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "####### not a heading");
    assert!(chunks[1].content.contains("def open():"));
}
