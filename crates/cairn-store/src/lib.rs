//! Vector/Keyword Index Adapter (spec §4.1, component C1).
//!
//! A narrow, uniform read surface over whatever storage engine is present, hiding its
//! quirks from the hybrid retriever (C2). No write or admin logic is in scope; the
//! out-of-scope ingestion pipeline owns writes.
//!
//! [`IndexAdapter`] is the seam: the retriever is generic over it (an injected
//! collaborator, per spec §9's "no ambient singletons" guidance), and `memory::InMemoryIndex`
//! is the reference implementation used by tests and by a small-corpus deployment. The
//! trait returns boxed futures rather than using `async fn in trait`, mirroring
//! `ploke_rag::core::Reranker` in the teacher crate — this keeps the trait object-safe so
//! callers can hold `Arc<dyn IndexAdapter>`.

use std::future::Future;
use std::pin::Pin;

use cairn_core::{ChunkId, DocId, Document, Filter};

pub mod error;
pub mod memory;
pub mod tokenizer;

pub use error::StoreError;
pub use memory::InMemoryIndex;

/// A resolved chunk: its text, chunk-level metadata, and a document metadata snapshot.
#[derive(Debug, Clone)]
pub struct ResolvedChunk {
    pub chunk: cairn_core::Chunk,
    pub document: Document,
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Uniform read interface over the storage engine (spec §4.1).
///
/// Contracts:
/// - results are sorted by score descending, ties broken by identifier ascending;
/// - filters are equality/set-containment predicates on metadata fields;
/// - operations are read-only and concurrency-safe; concurrent calls observe a single
///   consistent snapshot for the duration of one request (the in-memory reference
///   implementation achieves this with an `RwLock` read guard held for the call).
pub trait IndexAdapter: Send + Sync {
    /// Dense nearest-neighbor search. `query_vector` is a precomputed embedding (the LLM
    /// collaborator, not this adapter, computes embeddings). Cosine similarity is
    /// normalized to `[0, 1]` before returning.
    fn knn<'a>(&'a self, query_vector: &'a [f32], k: usize, filter: Option<&'a Filter>) -> BoxFut<'a, Vec<(ChunkId, f32)>>;

    /// BM25 over chunk text.
    fn bm25_chunk<'a>(&'a self, query_text: &'a str, k: usize, filter: Option<&'a Filter>) -> BoxFut<'a, Vec<(ChunkId, f32)>>;

    /// BM25 over concatenated document metadata (title/categories/entities/kind).
    fn bm25_meta<'a>(&'a self, query_text: &'a str, k: usize, filter: Option<&'a Filter>) -> BoxFut<'a, Vec<(DocId, f32)>>;

    /// Resolve a chunk reference to its text, chunk metadata, and document snapshot.
    fn resolve<'a>(&'a self, chunk_id: &'a ChunkId) -> BoxFut<'a, ResolvedChunk>;

    /// Total indexed chunk count.
    fn count<'a>(&'a self) -> BoxFut<'a, usize>;
}
