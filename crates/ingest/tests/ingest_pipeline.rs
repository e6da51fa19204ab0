use async_trait::async_trait;
use context_doc_ingest::{
    content_hash, Embedder, IngestConfig, IngestError, IngestPipeline, InMemoryChunkStore,
    StubEmbedder,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const GUIDE: &str = "# Guide\n\nInstall the tool first.\n\n## Usage\n\nRun it with a config.\n\n```bash\ntool --config tool.toml\n```\n";
const REGISTERS: &str = "Registers\n\nCTRL resets the device.\n";
const API: &str = "# API\n\nReads a register.\n\n```rust\npub fn read(offset: u32) -> u32\n```\n";

async fn write_tree(root: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(root.join("api")).await?;
    tokio::fs::create_dir_all(root.join("target")).await?;
    tokio::fs::write(root.join("guide.md"), GUIDE).await?;
    tokio::fs::write(root.join("registers.txt"), REGISTERS).await?;
    tokio::fs::write(root.join("api/read.md"), API).await?;
    tokio::fs::write(root.join("target/generated.md"), "# Generated\n").await?;
    tokio::fs::write(root.join("logo.svg"), "<svg/>").await?;
    Ok(())
}

fn small_chunks() -> IngestConfig {
    let mut config = IngestConfig::default();
    config.chunker.max_chunk_size = 120;
    config.chunker.min_chunk_size = 10;
    config.concurrency = 2;
    config
}

fn pipeline(config: IngestConfig, store: Arc<InMemoryChunkStore>) -> IngestPipeline {
    IngestPipeline::new(config, Arc::new(StubEmbedder::new(32).expect("dimension")), store)
        .expect("valid config")
}

#[tokio::test]
async fn ingests_tree_and_skips_unchanged_files() -> anyhow::Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    write_tree(temp.path()).await?;

    let store = Arc::new(InMemoryChunkStore::new());
    let pipeline = pipeline(small_chunks(), store.clone());

    let first = pipeline.ingest_dir(temp.path()).await?;
    assert_eq!(first.files, 3);
    assert_eq!(first.unchanged, 0);
    assert!(first.errors.is_empty(), "errors: {:?}", first.errors);
    assert_eq!(first.formats.get("md"), Some(&2));
    assert_eq!(first.formats.get("txt"), Some(&1));
    assert_eq!(first.chunks, store.len().await);
    assert_eq!(
        store.file_ids().await,
        vec!["api/read.md", "guide.md", "registers.txt"]
    );

    let guide = store.chunks_for("guide.md").await;
    assert!(guide.len() >= 2);
    for (index, stored) in guide.iter().enumerate() {
        assert_eq!(stored.chunk.chunk_index, index);
        assert_eq!(stored.content_hash, content_hash(GUIDE.as_bytes()));
        assert_eq!(stored.embedding.len(), 32);
        assert_eq!(stored.metadata.source_file, "guide.md");
        assert_eq!(stored.summary, None);
    }
    assert_eq!(
        guide.last().map(|stored| stored.metadata.heading_hierarchy.clone()),
        Some(vec!["Guide".to_string(), "Usage".to_string()])
    );

    let second = pipeline.ingest_dir(temp.path()).await?;
    assert_eq!(second.files, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(second.chunks, 0);
    assert_eq!(store.len().await, first.chunks);
    Ok(())
}

#[tokio::test]
async fn changed_file_replaces_stale_chunks() -> anyhow::Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    write_tree(temp.path()).await?;

    let store = Arc::new(InMemoryChunkStore::new());
    let pipeline = pipeline(small_chunks(), store.clone());
    pipeline.ingest_dir(temp.path()).await?;
    let before = store.chunks_for("guide.md").await.len();

    let updated = "# Guide\n\nEverything moved to the handbook.\n";
    tokio::fs::write(temp.path().join("guide.md"), updated).await?;

    let stats = pipeline.ingest_dir(temp.path()).await?;
    assert_eq!(stats.files, 1);
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.removed_chunks, before);

    let guide = store.chunks_for("guide.md").await;
    assert_eq!(guide.len(), 1);
    assert_eq!(guide[0].chunk.content, updated.trim_end());
    assert_eq!(guide[0].content_hash, content_hash(updated.as_bytes()));
    Ok(())
}

/// Fails for one marker and records how many calls overlap
struct FlakyEmbedder {
    inner: StubEmbedder,
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, text: &str) -> context_doc_ingest::Result<Vec<f32>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if text.contains("FAIL") {
            return Err(IngestError::embedding("provider rejected input"));
        }
        Ok(self.inner.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_pool_is_bounded_and_failures_are_collected() -> anyhow::Result<()> {
    init_logger();
    let temp = TempDir::new()?;
    for idx in 0..6 {
        let body = if idx == 3 { "FAIL here." } else { "Plain note." };
        tokio::fs::write(
            temp.path().join(format!("note-{idx}.md")),
            format!("# Note {idx}\n\n{body}\n"),
        )
        .await?;
    }

    let embedder = Arc::new(FlakyEmbedder {
        inner: StubEmbedder::new(8)?,
        active: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let store = Arc::new(InMemoryChunkStore::new());
    let config = IngestConfig {
        concurrency: 2,
        ..IngestConfig::default()
    };
    let pipeline = IngestPipeline::new(config, embedder.clone(), store.clone())?;

    let stats = pipeline.ingest_dir(temp.path()).await?;
    assert_eq!(stats.files, 5);
    assert_eq!(stats.errors.len(), 1);
    assert!(stats.errors[0].starts_with("note-3.md: "));
    assert_eq!(stats.seen(), 6);
    assert!(embedder.peak.load(Ordering::SeqCst) <= 2);

    let progress = pipeline.progress();
    assert_eq!((progress.processed, progress.total), (6, 6));
    assert_eq!(pipeline.limiter().snapshot().in_flight, 0);

    // The failed file left nothing behind and is retried on the next run.
    assert!(store.chunks_for("note-3.md").await.is_empty());
    let retry = pipeline.ingest_dir(temp.path()).await?;
    assert_eq!(retry.unchanged, 5);
    assert_eq!(retry.errors.len(), 1);
    Ok(())
}

#[tokio::test]
async fn summaries_are_attached_when_enabled() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    write_tree(temp.path()).await?;

    let store = Arc::new(InMemoryChunkStore::new());
    let config = IngestConfig {
        summarize: true,
        ..small_chunks()
    };
    pipeline(config, store.clone()).ingest_dir(temp.path()).await?;

    let registers = store.chunks_for("registers.txt").await;
    assert_eq!(registers.len(), 1);
    assert_eq!(
        registers[0].summary.as_deref(),
        Some("Document Content: Registers")
    );
    Ok(())
}

#[tokio::test]
async fn missing_root_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let store = Arc::new(InMemoryChunkStore::new());
    let result = pipeline(IngestConfig::default(), store)
        .ingest_dir(temp.path().join("absent"))
        .await;
    assert!(matches!(result, Err(IngestError::InvalidPath(_))));
}
