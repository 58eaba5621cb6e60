use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::chunker::ContentChunk;
use crate::content::embedder::EmbeddingProvider;
use crate::content::store::{ChunkStore, EmbeddedChunk};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Embed,
    Store,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    pub index: usize,
    pub stage: IngestStage,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub attempted: usize,
    pub stored: usize,
    pub failures: Vec<IngestFailure>,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.stored == self.attempted
    }
}

/// Embed and store chunks one at a time. A failing chunk is logged and
/// recorded; the batch always runs to the end.
pub async fn ingest(
    chunks: &[ContentChunk],
    provider: &dyn EmbeddingProvider,
    store: &dyn ChunkStore,
) -> IngestReport {
    let started_at = Utc::now();
    let mut stored = 0;
    let mut failures = Vec::new();

    for chunk in chunks {
        let embedding = match provider.embed(&chunk.text).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    "Embedding failed for {} chunk {} via {}: {}",
                    chunk.source,
                    chunk.index,
                    provider.name(),
                    e
                );
                failures.push(IngestFailure {
                    index: chunk.index,
                    stage: IngestStage::Embed,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let row = EmbeddedChunk::new(chunk.clone(), provider.model(), embedding);
        match store.upsert(row).await {
            Ok(()) => stored += 1,
            Err(e) => {
                tracing::warn!("Store failed for {} chunk {}: {}", chunk.source, chunk.index, e);
                failures.push(IngestFailure {
                    index: chunk.index,
                    stage: IngestStage::Store,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Ingested {}/{} chunk(s), {} failure(s)",
        stored,
        chunks.len(),
        failures.len()
    );

    IngestReport {
        attempted: chunks.len(),
        stored,
        failures,
        model: provider.model().to_string(),
        started_at,
        finished_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::chunker::{chunk_document, ChunkStrategy};
    use crate::content::embedder::EmbeddingError;
    use crate::content::store::{MemoryChunkStore, StoreError};
    use async_trait::async_trait;

    /// Fails on any text containing "FAIL".
    struct FlakyEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "flaky-1"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("FAIL") {
                Err(EmbeddingError::ApiError {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(vec![text.len() as f32])
            }
        }
    }

    struct RejectingStore;

    #[async_trait]
    impl ChunkStore for RejectingStore {
        async fn upsert(&self, _chunk: EmbeddedChunk) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn chunks() -> Vec<ContentChunk> {
        chunk_document(
            "course.md",
            "First paragraph.\n\nThis one will FAIL.\n\nThird paragraph.",
            ChunkStrategy::Paragraph { max_chars: 20 },
        )
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let store = MemoryChunkStore::new();
        let report = ingest(&chunks(), &FlakyEmbedder, &store).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.stored, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].stage, IngestStage::Embed);
        assert!(!report.is_complete());
        assert_eq!(store.len().await, 2);
        assert_eq!(report.model, "flaky-1");
    }

    #[tokio::test]
    async fn test_store_failures_counted() {
        let report = ingest(&chunks(), &FlakyEmbedder, &RejectingStore).await;
        assert_eq!(report.stored, 0);
        assert_eq!(report.failures.len(), 3);
        assert_eq!(
            report
                .failures
                .iter()
                .filter(|f| f.stage == IngestStage::Store)
                .count(),
            2
        );
    }
}
