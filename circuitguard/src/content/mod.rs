//! Content ingestion for regulation and course text
//!
//! Text is split into section-tagged chunks, embedded through an
//! [`EmbeddingProvider`], and written to a [`ChunkStore`]. Ingest handles
//! failures per chunk, so one bad chunk never stops a batch.

pub mod chunker;
pub mod embedder;
pub mod ingest;
pub mod store;

pub use chunker::{
    chunk_document, chunk_fixed, chunk_paragraphs, detect_sections, token_estimate, ChunkStrategy,
    ContentChunk, Section, SectionKind,
};
pub use embedder::{EmbeddingError, EmbeddingProvider, HttpEmbeddingClient};
pub use ingest::{ingest, IngestFailure, IngestReport, IngestStage};
pub use store::{ChunkStore, EmbeddedChunk, JsonlChunkStore, MemoryChunkStore, StoreError};
