//! The dense-embedding collaborator (spec §6 LLM contract: `embed(text) -> vector`).
//!
//! The retriever never talks to a model directly; it only knows this trait, mirroring how
//! `ploke_rag::RagService` is generic over `ploke_embed::EmbeddingProcessor`. When the
//! embedder is unavailable (`embed` returns an error), the retriever degrades to
//! BM25-only mode rather than failing the request (spec §4.2).

use std::future::Future;
use std::pin::Pin;

#[derive(thiserror::Error, Debug)]
pub enum EmbedError {
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, EmbedError>> + Send + 'a>>;

/// Computes a dense embedding vector for a piece of text.
pub trait Embedder: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFut<'a, Vec<f32>>;
}

/// An embedder that always fails, useful for exercising BM25-only degraded mode in tests
/// and for deployments with no dense backend configured.
#[derive(Debug, Default)]
pub struct NoEmbedder;

impl Embedder for NoEmbedder {
    fn embed<'a>(&'a self, _text: &'a str) -> BoxFut<'a, Vec<f32>> {
        Box::pin(async move { Err(EmbedError::Unavailable("no embedder configured".into())) })
    }
}
