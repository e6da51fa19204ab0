use crate::error::{IngestError, Result};
use crate::limits::{concurrency_from_env, MAX_INGEST_CONCURRENCY};
use context_doc_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Files larger than this are skipped by default (1 MiB)
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Extensions picked up by the scanner when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    // Documentation
    "md", "markdown", "mdx", "rst", "txt", "adoc", "org",
    // Device modelling
    "dml",
    // Source
    "rs", "py", "c", "h", "cc", "cpp", "hpp", "go", "java", "js", "ts", "sh",
    // Config
    "toml", "yaml", "yml",
];

/// Configuration for an ingest run, usually loaded from TOML
///
/// ```toml
/// concurrency = 4
/// summarize = true
/// extensions = ["md", "rst"]
///
/// [chunker]
/// max_chunk_size = 800
/// size_metric = "tokens"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Chunking parameters applied to every file
    pub chunker: ChunkerConfig,

    /// Number of files processed at once (clamped to 1..=32)
    pub concurrency: usize,

    /// Attach a summary to every stored chunk
    pub summarize: bool,

    /// File extensions to ingest, without the leading dot
    pub extensions: Vec<String>,

    /// Files above this size are skipped
    pub max_file_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            concurrency: concurrency_from_env(),
            summarize: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl IngestConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate().map_err(IngestError::invalid_config)?;
        Ok(config)
    }

    /// Read a TOML file and parse it with [`IngestConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        log::debug!("Loaded ingest config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Worker count actually used by the pipeline
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_INGEST_CONCURRENCY)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.chunker
            .validate()
            .map_err(|err| format!("chunker: {err}"))?;

        if self.extensions.is_empty() {
            return Err("extensions must not be empty".to_string());
        }

        if let Some(bad) = self
            .extensions
            .iter()
            .find(|ext| ext.trim().is_empty() || ext.starts_with('.'))
        {
            return Err(format!(
                "invalid extension {bad:?}: expected a bare name such as \"md\""
            ));
        }

        if self.max_file_bytes == 0 {
            return Err("max_file_bytes must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_doc_chunker::SizeMetric;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.extensions.iter().any(|ext| ext == "md"));
        assert!((1..=MAX_INGEST_CONCURRENCY).contains(&config.effective_concurrency()));
    }

    #[test]
    fn parses_partial_toml() {
        let config = IngestConfig::from_toml_str(
            r#"
concurrency = 3
summarize = true
extensions = ["md", "rst"]

[chunker]
max_chunk_size = 800
size_metric = "tokens"
"#,
        )
        .expect("valid config");

        assert_eq!(config.concurrency, 3);
        assert!(config.summarize);
        assert_eq!(config.extensions, vec!["md", "rst"]);
        assert_eq!(config.chunker.max_chunk_size, 800);
        assert_eq!(config.chunker.min_chunk_size, 100);
        assert_eq!(config.chunker.size_metric, SizeMetric::Tokens);
        assert_eq!(config.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
    }

    #[test]
    fn concurrency_is_clamped_not_rejected() {
        let config = IngestConfig::from_toml_str("concurrency = 0").expect("valid config");
        assert_eq!(config.effective_concurrency(), 1);

        let config = IngestConfig::from_toml_str("concurrency = 64").expect("valid config");
        assert_eq!(config.effective_concurrency(), MAX_INGEST_CONCURRENCY);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = IngestConfig::from_toml_str("[chunker]\nmax_chunk_size = 0\nmin_chunk_size = 0")
            .expect_err("zero max");
        assert!(matches!(err, IngestError::InvalidConfig(_)));

        let err = IngestConfig::from_toml_str("extensions = []").expect_err("no extensions");
        assert!(err.to_string().contains("extensions"));

        let err = IngestConfig::from_toml_str("extensions = [\".md\"]").expect_err("dotted");
        assert!(err.to_string().contains(".md"));

        let err = IngestConfig::from_toml_str("max_file_bytes = 0").expect_err("zero cap");
        assert!(err.to_string().contains("max_file_bytes"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = IngestConfig::from_toml_str("concurrency = ").expect_err("bad toml");
        assert!(matches!(err, IngestError::ConfigParse(_)));
    }

    #[test]
    fn loads_from_file() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("ingest.toml");
        std::fs::write(&path, "summarize = true\n")?;

        let config = IngestConfig::load(&path)?;
        assert!(config.summarize);

        assert!(matches!(
            IngestConfig::load(temp.path().join("missing.toml")),
            Err(IngestError::IoError(_))
        ));
        Ok(())
    }
}
