//! Reference [`IndexAdapter`] implementation: an in-memory store with brute-force cosine
//! KNN and two independent BM25 indices (chunk text, document metadata), grounded on
//! `ploke_db::bm25_index::Bm25Indexer` (`bm25::EmbedderBuilder`/`Scorer`) but generic over
//! the identifier type and built with [`crate::tokenizer::WordTokenizer`] instead of the
//! teacher's code-identifier tokenizer.
//!
//! Suitable for small corpora and for tests; a production deployment swaps this crate's
//! [`IndexAdapter`] implementor for one backed by a real vector/keyword engine without
//! touching the retriever.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::RwLock;

use cairn_core::filter::Predicate;
use cairn_core::{ChunkId, DocId, Document, Filter};
use itertools::Itertools;

use crate::error::StoreError;
use crate::tokenizer::WordTokenizer;
use crate::{IndexAdapter, ResolvedChunk};

/// A minimal BM25 index over an arbitrary identifier type, rebuilt wholesale on each
/// mutation. Fine for the reference implementation's target corpus sizes; a real engine
/// would maintain this incrementally.
struct Bm25Index<Id: Hash + Eq + Clone + Send + Sync + 'static> {
    embedder: bm25::Embedder<u32, WordTokenizer>,
    scorer: bm25::Scorer<Id, u32>,
}

impl<Id: Hash + Eq + Clone + Send + Sync + 'static> Bm25Index<Id> {
    fn build(docs: &[(Id, String)]) -> Self {
        let lens: Vec<usize> = docs.iter().map(|(_, t)| WordTokenizer::tokens(t).len()).collect();
        let avgdl = if lens.is_empty() {
            1.0
        } else {
            (lens.iter().sum::<usize>() as f32 / lens.len() as f32).max(1.0)
        };
        let embedder = bm25::EmbedderBuilder::<u32, WordTokenizer>::with_avgdl(avgdl).build();
        let mut scorer = bm25::Scorer::<Id, u32>::new();
        for (id, text) in docs {
            let embedding = embedder.embed(text);
            scorer.upsert(id, embedding);
        }
        Self { embedder, scorer }
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<(Id, f32)> {
        let qemb = self.embedder.embed(query);
        let mut matches = self.scorer.matches(&qemb);
        matches.truncate(top_k);
        matches.into_iter().map(|m| (m.id, m.score)).collect()
    }
}

#[derive(Default)]
struct Inner {
    documents: HashMap<DocId, Document>,
    chunks: HashMap<ChunkId, cairn_core::Chunk>,
    embeddings: HashMap<ChunkId, Vec<f32>>,
}

impl Inner {
    fn matches_filter(doc: &Document, filter: Option<&Filter>) -> bool {
        let Some(filter) = filter else { return true };
        filter.predicates.iter().all(|(field, pred)| {
            let value = match field.as_str() {
                "kind" => format!("{:?}", doc.kind).to_lowercase(),
                "language" => doc.language.clone(),
                "geographic_scope" => doc.geographic_scope.clone().unwrap_or_default(),
                "currency" => doc.currency.clone().unwrap_or_default(),
                "doc_id" => doc.id.0.clone(),
                _ => String::new(),
            };
            let list_value: &[String] = match field.as_str() {
                "category" | "categories" => &doc.categories,
                "product_entity" | "product_entities" => &doc.product_entities,
                _ => &[],
            };
            match pred {
                Predicate::Eq(v) => &value == v,
                Predicate::Contains(v) => list_value.iter().any(|x| x == v),
            }
        })
    }
}

/// In-memory reference implementation of [`IndexAdapter`].
pub struct InMemoryIndex {
    inner: RwLock<Inner>,
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Seed a document (out-of-scope ingestion would call this in a real deployment).
    pub fn insert_document(&self, document: Document) {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.documents.insert(document.id.clone(), document);
    }

    /// Seed a chunk with its precomputed dense embedding.
    pub fn insert_chunk(&self, chunk: cairn_core::Chunk, embedding: Vec<f32>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.embeddings.insert(chunk.id.clone(), embedding);
        inner.chunks.insert(chunk.id.clone(), chunk);
    }

    fn allowed_chunk_ids(inner: &Inner, filter: Option<&Filter>) -> Vec<ChunkId> {
        inner
            .chunks
            .values()
            .filter(|c| {
                inner
                    .documents
                    .get(&c.doc_id)
                    .is_some_and(|d| Inner::matches_filter(d, filter))
            })
            .map(|c| c.id.clone())
            .sorted()
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).take(len).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

impl IndexAdapter for InMemoryIndex {
    fn knn<'a>(&'a self, query_vector: &'a [f32], k: usize, filter: Option<&'a Filter>) -> BoxFut<'a, Vec<(ChunkId, f32)>> {
        Box::pin(async move {
            let inner = self.inner.read().map_err(|_| StoreError::Backend("lock poisoned".into()))?;
            let allowed = Inner::allowed_chunk_ids(&inner, filter);
            let mut scored: Vec<(ChunkId, f32)> = allowed
                .into_iter()
                .filter_map(|id| {
                    let emb = inner.embeddings.get(&id)?;
                    // cosine is already in [-1,1]; normalize to [0,1] per spec §4.1.
                    let sim = (cosine(query_vector, emb) + 1.0) / 2.0;
                    Some((id, sim))
                })
                .collect();
            scored.sort_by(|(ida, sa), (idb, sb)| {
                sb.partial_cmp(sa).unwrap_or(std::cmp::Ordering::Equal).then_with(|| ida.cmp(idb))
            });
            scored.truncate(k);
            Ok(scored)
        })
    }

    fn bm25_chunk<'a>(&'a self, query_text: &'a str, k: usize, filter: Option<&'a Filter>) -> BoxFut<'a, Vec<(ChunkId, f32)>> {
        Box::pin(async move {
            let inner = self.inner.read().map_err(|_| StoreError::Backend("lock poisoned".into()))?;
            let allowed: std::collections::HashSet<ChunkId> =
                Inner::allowed_chunk_ids(&inner, filter).into_iter().collect();
            let corpus: Vec<(ChunkId, String)> = inner
                .chunks
                .iter()
                .filter(|(id, _)| allowed.contains(*id))
                .map(|(id, c)| (id.clone(), c.text.clone()))
                .sorted_by(|a, b| a.0.cmp(&b.0))
                .collect();
            if corpus.is_empty() {
                return Ok(Vec::new());
            }
            let index = Bm25Index::build(&corpus);
            let mut results = index.search(query_text, k);
            results.sort_by(|(ida, sa), (idb, sb)| {
                sb.partial_cmp(sa).unwrap_or(std::cmp::Ordering::Equal).then_with(|| ida.cmp(idb))
            });
            Ok(results)
        })
    }

    fn bm25_meta<'a>(&'a self, query_text: &'a str, k: usize, filter: Option<&'a Filter>) -> BoxFut<'a, Vec<(DocId, f32)>> {
        Box::pin(async move {
            let inner = self.inner.read().map_err(|_| StoreError::Backend("lock poisoned".into()))?;
            let corpus: Vec<(DocId, String)> = inner
                .documents
                .values()
                .filter(|d| Inner::matches_filter(d, filter))
                .map(|d| (d.id.clone(), d.metadata_text()))
                .sorted_by(|a, b| a.0.cmp(&b.0))
                .collect();
            if corpus.is_empty() {
                return Ok(Vec::new());
            }
            let index = Bm25Index::build(&corpus);
            let mut results = index.search(query_text, k);
            results.sort_by(|(ida, sa), (idb, sb)| {
                sb.partial_cmp(sa).unwrap_or(std::cmp::Ordering::Equal).then_with(|| ida.cmp(idb))
            });
            Ok(results)
        })
    }

    fn resolve<'a>(&'a self, chunk_id: &'a ChunkId) -> BoxFut<'a, ResolvedChunk> {
        Box::pin(async move {
            let inner = self.inner.read().map_err(|_| StoreError::Backend("lock poisoned".into()))?;
            let chunk = inner
                .chunks
                .get(chunk_id)
                .cloned()
                .ok_or_else(|| StoreError::ChunkNotFound(chunk_id.clone()))?;
            let document = inner
                .documents
                .get(&chunk.doc_id)
                .cloned()
                .ok_or_else(|| StoreError::Backend(format!("chunk {} has no resolvable document", chunk_id)))?;
            Ok(ResolvedChunk { chunk, document })
        })
    }

    fn count<'a>(&'a self) -> BoxFut<'a, usize> {
        Box::pin(async move {
            let inner = self.inner.read().map_err(|_| StoreError::Backend("lock poisoned".into()))?;
            Ok(inner.chunks.len())
        })
    }
}
