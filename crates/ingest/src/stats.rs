use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Statistics about an ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Files parsed and chunked
    pub files: usize,

    /// Files left alone because their content hash was already stored
    pub unchanged: usize,

    /// Chunks written to the store
    pub chunks: usize,

    /// Stale chunks removed before re-ingesting changed files
    pub removed_chunks: usize,

    /// Lines across all ingested files
    pub total_lines: usize,

    /// Files whose parse produced warnings
    pub files_with_warnings: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Ingested files per extension
    pub formats: BTreeMap<String, usize>,

    /// Per-file failures, `"<file id>: <error>"`
    pub errors: Vec<String>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, format: &str, lines: usize) {
        self.files += 1;
        self.total_lines += lines;
        *self.formats.entry(format.to_string()).or_insert(0) += 1;
    }

    pub fn add_unchanged(&mut self) {
        self.unchanged += 1;
    }

    pub fn add_chunks(&mut self, count: usize) {
        self.chunks += count;
    }

    pub fn add_removed(&mut self, count: usize) {
        self.removed_chunks += count;
    }

    pub fn add_warnings(&mut self, count: usize) {
        if count > 0 {
            self.files_with_warnings += 1;
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Files the run looked at, whatever the outcome
    pub fn seen(&self) -> usize {
        self.files + self.unchanged + self.errors.len()
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files ingested, {} unchanged, {} chunks stored, {} stale removed, {} errors in {}ms",
            self.files,
            self.unchanged,
            self.chunks,
            self.removed_chunks,
            self.errors.len(),
            self.time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_accumulate() {
        let mut stats = IngestStats::new();
        stats.add_file("md", 10);
        stats.add_file("md", 5);
        stats.add_file("rst", 1);
        stats.add_chunks(4);
        stats.add_unchanged();
        stats.add_warnings(0);
        stats.add_warnings(2);
        stats.add_error("a.md: boom".to_string());

        assert_eq!(stats.files, 3);
        assert_eq!(stats.total_lines, 16);
        assert_eq!(stats.formats.get("md"), Some(&2));
        assert_eq!(stats.files_with_warnings, 1);
        assert_eq!(stats.seen(), 5);
        assert_eq!(
            stats.to_string(),
            "3 files ingested, 1 unchanged, 4 chunks stored, 0 stale removed, 1 errors in 0ms"
        );
    }
}
