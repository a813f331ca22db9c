//! Hybrid Retriever (spec §4.2, component C2).
//!
//! Given a user utterance and optional metadata filter, returns a deterministic ranked
//! list of passages with per-signal diagnostic scores, fusing dense KNN, chunk BM25, and
//! metadata BM25 (expanded to chunks) via Reciprocal Rank Fusion plus a clamped heuristic
//! adjustment. Generic over [`cairn_store::IndexAdapter`] and [`embedder::Embedder`] —
//! injected collaborators, not ambient singletons (spec §9).

pub mod config;
pub mod embedder;
pub mod error;
pub mod fusion;
pub mod retriever;

pub use config::{HeuristicWeights, RetrieverConfig};
pub use embedder::{EmbedError, Embedder, NoEmbedder};
pub use error::RetrieveError;
pub use retriever::{HybridRetriever, RetrievalDiagnostics, RetrievalOutcome};
