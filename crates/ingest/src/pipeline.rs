use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::limits::IngestLimiter;
use crate::scanner::{file_id, DocumentScanner};
use crate::stats::IngestStats;
use crate::summarizer::HeadingSummarizer;
use crate::traits::{ChunkStore, Embedder, StoredChunk, Summarizer};
use context_doc_chunker::{
    DocumentParser, EstimatedTokenizer, MetadataExtractor, SemanticChunker, SizeMetric, Tokenizer,
};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// What happened to a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The store already holds chunks built from identical bytes
    Unchanged,

    Ingested {
        chunks: usize,
        removed: usize,
        lines: usize,
        warnings: usize,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct Progress {
    processed: AtomicUsize,
    total: AtomicUsize,
}

/// Hex sha-256 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Parse, chunk, embed and store documents.
///
/// Cloning is cheap: every clone shares the same providers, worker pool and
/// progress counters.
#[derive(Clone)]
pub struct IngestPipeline {
    config: Arc<IngestConfig>,
    parser: DocumentParser,
    chunker: Arc<SemanticChunker>,
    extractor: MetadataExtractor,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn ChunkStore>,
    limiter: IngestLimiter,
    progress: Arc<Progress>,
}

impl IngestPipeline {
    pub fn new(
        config: IngestConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
    ) -> Result<Self> {
        config.validate().map_err(IngestError::invalid_config)?;
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(EstimatedTokenizer);
        let chunker = SemanticChunker::with_tokenizer(config.chunker.clone(), tokenizer.clone())?;
        let limiter = IngestLimiter::new(config.effective_concurrency());

        Ok(Self {
            extractor: extractor_for(&config, tokenizer),
            parser: DocumentParser::new(),
            chunker: Arc::new(chunker),
            embedder,
            summarizer: Arc::new(HeadingSummarizer::default()),
            store,
            limiter,
            progress: Arc::new(Progress::default()),
            config: Arc::new(config),
        })
    }

    /// Measure token sizes with `tokenizer` instead of the estimate
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        let chunker =
            SemanticChunker::with_tokenizer(self.config.chunker.clone(), tokenizer.clone())?;
        self.chunker = Arc::new(chunker);
        self.extractor = extractor_for(&self.config, tokenizer);
        Ok(self)
    }

    /// Summarizer used when `summarize` is enabled
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn limiter(&self) -> &IngestLimiter {
        &self.limiter
    }

    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.progress.processed.load(Ordering::Relaxed),
            total: self.progress.total.load(Ordering::Relaxed),
        }
    }

    /// Ingest one file of the tree rooted at `root`.
    ///
    /// Files whose bytes hash to what the store already holds are left alone.
    /// Otherwise every record is built first, and the file's old chunks are
    /// only replaced once embedding and summarizing have succeeded.
    pub async fn ingest_file(&self, root: &Path, path: &Path) -> Result<FileOutcome> {
        let file_id = file_id(root, path).ok_or_else(|| {
            IngestError::invalid_path(format!(
                "{} is not inside {}",
                path.display(),
                root.display()
            ))
        })?;

        let bytes = tokio::fs::read(path).await?;
        let hash = content_hash(&bytes);
        if self.store.has_file_hash(&file_id, &hash).await? {
            log::debug!("Skipping unchanged {file_id}");
            return Ok(FileOutcome::Unchanged);
        }

        let parser = self.parser;
        let chunker = self.chunker.clone();
        let extractor = self.extractor.clone();
        let source = file_id.clone();
        let (warnings, lines, chunks, metadata) = tokio::task::spawn_blocking(move || {
            let report = parser.parse_bytes(&bytes, &source);
            let doc = report.structure;
            let chunks = chunker.chunk_document(&doc);
            let metadata = extractor.extract_all(&chunks, &doc);
            (report.warnings.len(), doc.line_count(), chunks, metadata)
        })
        .await
        .map_err(|err| IngestError::Task(err.to_string()))?;

        let mut records = Vec::with_capacity(chunks.len());
        for (chunk, metadata) in chunks.into_iter().zip(metadata) {
            let embedding = self.embed(&chunk.content).await?;
            let summary = if self.config.summarize {
                let context = metadata.heading_hierarchy.join(" > ");
                Some(self.summarizer.summarize(&chunk.content, &context).await?)
            } else {
                None
            };
            records.push(StoredChunk {
                file_id: file_id.clone(),
                content_hash: hash.clone(),
                chunk,
                metadata,
                embedding,
                summary,
            });
        }

        let removed = self.store.remove_file(&file_id).await?;
        if removed > 0 {
            log::debug!("Removed {removed} stale chunks of {file_id}");
        }

        let stored = records.len();
        for record in records {
            if let Err(err) = self.store.store_chunk(record).await {
                if let Err(cleanup) = self.store.remove_file(&file_id).await {
                    log::warn!("Failed to roll back {file_id}: {cleanup}");
                }
                return Err(err);
            }
        }

        log::debug!("Stored {stored} chunks for {file_id}");
        Ok(FileOutcome::Ingested {
            chunks: stored,
            removed,
            lines,
            warnings,
        })
    }

    /// Ingest every matching file under `root` on the bounded worker pool.
    ///
    /// Per-file failures are collected into [`IngestStats::errors`]; only an
    /// unusable root fails the whole run.
    pub async fn ingest_dir(&self, root: impl AsRef<Path>) -> Result<IngestStats> {
        let started = Instant::now();
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IngestError::invalid_path(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let scanner = DocumentScanner::from_config(&root, &self.config);
        let files = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|err| IngestError::Task(err.to_string()))?;

        self.progress.processed.store(0, Ordering::Relaxed);
        self.progress.total.store(files.len(), Ordering::Relaxed);

        let mut tasks = JoinSet::new();
        for path in files {
            let pipeline = self.clone();
            let root = root.clone();
            tasks.spawn(async move {
                let _permit = pipeline.limiter.acquire().await;
                let outcome = pipeline.ingest_file(&root, &path).await;
                pipeline.progress.processed.fetch_add(1, Ordering::Relaxed);
                (path, outcome)
            });
        }

        let mut stats = IngestStats::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((path, outcome)) => record_outcome(&mut stats, &root, &path, outcome),
                Err(err) => {
                    log::error!("Ingest worker failed: {err}");
                    stats.add_error(format!("worker: {err}"));
                }
            }
        }

        stats.errors.sort();
        stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!("Ingested {}: {stats}", root.display());
        Ok(stats)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(text).await?;
        if vector.len() != self.embedder.dimension() {
            return Err(IngestError::embedding(format!(
                "{} returned {} dimensions, expected {}",
                self.embedder.name(),
                vector.len(),
                self.embedder.dimension()
            )));
        }
        Ok(vector)
    }
}

fn extractor_for(config: &IngestConfig, tokenizer: Arc<dyn Tokenizer>) -> MetadataExtractor {
    match config.chunker.size_metric {
        SizeMetric::Tokens => MetadataExtractor::with_tokenizer(tokenizer),
        SizeMetric::Characters => MetadataExtractor::new(),
    }
}

fn record_outcome(
    stats: &mut IngestStats,
    root: &Path,
    path: &Path,
    outcome: Result<FileOutcome>,
) {
    match outcome {
        Ok(FileOutcome::Unchanged) => stats.add_unchanged(),
        Ok(FileOutcome::Ingested {
            chunks,
            removed,
            lines,
            warnings,
        }) => {
            let format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or_else(|| "none".to_string(), str::to_ascii_lowercase);
            stats.add_file(&format, lines);
            stats.add_chunks(chunks);
            stats.add_removed(removed);
            stats.add_warnings(warnings);
        }
        Err(err) => {
            let id = file_id(root, path).unwrap_or_else(|| path.display().to_string());
            log::warn!("Failed to ingest {id}: {err}");
            stats.add_error(format!("{id}: {err}"));
        }
    }
}
