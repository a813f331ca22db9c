//! `RetrievedPassage` (spec §3): a chunk as returned by the hybrid retriever, carrying
//! per-signal diagnostic scores and a resolved document metadata snapshot.

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, DocKind};
use crate::ids::{ChunkId, DocId};

/// Per-signal diagnostic scores computed during fusion (spec §4.2).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalScores {
    pub dense: Option<f32>,
    pub bm25_chunk: Option<f32>,
    pub bm25_meta: Option<f32>,
    pub heuristic: f32,
}

/// A snapshot of the document-level metadata a passage's owning document carried at
/// retrieval time (read-only; never mutated by the retriever).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub doc_id: DocId,
    pub kind: DocKind,
    pub location: String,
    pub authority_score: f64,
    pub categories: Vec<String>,
    pub product_entities: Vec<String>,
}

/// A single ranked result from the hybrid retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub chunk_id: ChunkId,
    pub text: String,
    pub scores: SignalScores,
    pub fused_score: f32,
    pub document: DocumentSnapshot,
    pub rank: usize,
}

impl RetrievedPassage {
    /// Convenience constructor used by the adapter's `resolve` path and by tests; not a
    /// public retrieval API in itself.
    pub fn new(chunk: &Chunk, document: DocumentSnapshot, scores: SignalScores, fused_score: f32, rank: usize) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            text: chunk.text.clone(),
            scores,
            fused_score,
            document,
            rank,
        }
    }
}
