//! In-memory [`ChunkStore`] used by tests and one-shot runs.

use crate::error::Result;
use crate::traits::{ChunkStore, StoredChunk};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

struct FileEntry {
    content_hash: String,
    chunks: BTreeMap<usize, StoredChunk>,
}

/// Chunks grouped by file id behind a `tokio` read/write lock
pub struct InMemoryChunkStore {
    files: RwLock<HashMap<String, FileEntry>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Total number of stored chunks
    pub async fn len(&self) -> usize {
        self.files
            .read()
            .await
            .values()
            .map(|entry| entry.chunks.len())
            .sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sorted ids of files with at least one chunk
    pub async fn file_ids(&self) -> Vec<String> {
        let files = self.files.read().await;
        let mut ids: Vec<String> = files
            .iter()
            .filter(|(_, entry)| !entry.chunks.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Chunks of `file_id` in chunk order
    pub async fn chunks_for(&self, file_id: &str) -> Vec<StoredChunk> {
        self.files
            .read()
            .await
            .get(file_id)
            .map(|entry| entry.chunks.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn store_chunk(&self, chunk: StoredChunk) -> Result<()> {
        let mut files = self.files.write().await;
        let entry = files
            .entry(chunk.file_id.clone())
            .or_insert_with(|| FileEntry {
                content_hash: chunk.content_hash.clone(),
                chunks: BTreeMap::new(),
            });

        // Chunks of an older revision never survive next to new ones.
        if entry.content_hash != chunk.content_hash {
            entry.content_hash.clone_from(&chunk.content_hash);
            entry.chunks.clear();
        }
        entry.chunks.insert(chunk.chunk.chunk_index, chunk);
        Ok(())
    }

    async fn has_file_hash(&self, file_id: &str, content_hash: &str) -> Result<bool> {
        Ok(self
            .files
            .read()
            .await
            .get(file_id)
            .is_some_and(|entry| entry.content_hash == content_hash && !entry.chunks.is_empty()))
    }

    async fn remove_file(&self, file_id: &str) -> Result<usize> {
        let removed = self
            .files
            .write()
            .await
            .remove(file_id)
            .map_or(0, |entry| entry.chunks.len());
        Ok(removed)
    }
}
