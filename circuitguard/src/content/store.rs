//! Embedded chunk storage

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::content::chunker::ContentChunk;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A chunk with its embedding vector, as written to a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: ContentChunk,
    pub model: String,
    pub embedding: Vec<f32>,
    pub embedded_at: DateTime<Utc>,
}

impl EmbeddedChunk {
    pub fn new(chunk: ContentChunk, model: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            chunk,
            model: model.into(),
            embedding,
            embedded_at: Utc::now(),
        }
    }

    /// Upsert key: one row per (source, index).
    pub fn key(&self) -> (String, usize) {
        (self.chunk.source.clone(), self.chunk.index)
    }
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or replace the row for this chunk's (source, index).
    async fn upsert(&self, chunk: EmbeddedChunk) -> Result<(), StoreError>;
}

/// In-memory store, mainly for tests and dry runs.
#[derive(Default)]
pub struct MemoryChunkStore {
    rows: Mutex<Vec<EmbeddedChunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    pub async fn rows(&self) -> Vec<EmbeddedChunk> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert(&self, chunk: EmbeddedChunk) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        let key = chunk.key();
        match rows.iter_mut().find(|r| r.key() == key) {
            Some(existing) => *existing = chunk,
            None => rows.push(chunk),
        }
        Ok(())
    }
}

/// Appends one JSON object per line. On read, the last row for a key wins.
pub struct JsonlChunkStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlChunkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every stored row, keeping the latest per (source, index).
    pub fn read_all(path: &Path) -> Result<Vec<EmbeddedChunk>, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let mut order: Vec<(String, usize)> = Vec::new();
        let mut latest: HashMap<(String, usize), EmbeddedChunk> = HashMap::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let row: EmbeddedChunk = serde_json::from_str(line)?;
            let key = row.key();
            if latest.insert(key.clone(), row).is_none() {
                order.push(key);
            }
        }
        Ok(order
            .into_iter()
            .filter_map(|k| latest.remove(&k))
            .collect())
    }
}

#[async_trait]
impl ChunkStore for JsonlChunkStore {
    async fn upsert(&self, chunk: EmbeddedChunk) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(&chunk)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, text: &str) -> EmbeddedChunk {
        EmbeddedChunk::new(
            ContentChunk {
                source: "regs.md".to_string(),
                section: None,
                index,
                text: text.to_string(),
                token_estimate: 1,
            },
            "test-model",
            vec![0.5, 0.25],
        )
    }

    #[tokio::test]
    async fn test_memory_store_upsert_replaces() {
        let store = MemoryChunkStore::new();
        store.upsert(row(0, "first")).await.unwrap();
        store.upsert(row(1, "second")).await.unwrap();
        store.upsert(row(0, "first again")).await.unwrap();
        let rows = store.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].chunk.text, "first again");
    }

    #[tokio::test]
    async fn test_jsonl_store_appends_and_reads_latest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.jsonl");
        let store = JsonlChunkStore::new(&path);
        store.upsert(row(0, "a")).await.unwrap();
        store.upsert(row(1, "b")).await.unwrap();
        store.upsert(row(0, "a2")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 3);
        assert!(raw.lines().all(|l| l.contains("\"embeddedAt\"")));

        let rows = JsonlChunkStore::read_all(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].chunk.text, "a2");
        assert_eq!(rows[1].chunk.text, "b");
    }
}
