//! The Hybrid Retriever (spec §4.2, component C2).
//!
//! Fans out dense KNN, chunk BM25, and metadata BM25 (expanded to chunks) concurrently via
//! `tokio::join!`, exactly as `ploke_rag::core::RagService::hybrid_search` does for its two
//! lists — widened here to three and followed by the heuristic adjustment step the teacher
//! has no equivalent for.

use std::collections::HashMap;
use std::sync::Arc;

use cairn_core::{ChunkId, DocId, Filter, SignalScores};
use chrono::Utc;
use tracing::{debug, instrument, warn};

use cairn_store::IndexAdapter;

use crate::config::RetrieverConfig;
use crate::embedder::Embedder;
use crate::error::RetrieveError;
use crate::fusion::{clamp_to_median_band, freshness_decay, heuristic_term, median, rrf_fuse};

/// Diagnostics surfaced alongside the ranked passage list (spec §4.4 RETRIEVE node: "chunk
/// count, avg/min/max fused score, context length").
#[derive(Debug, Clone, Default)]
pub struct RetrievalDiagnostics {
    pub dense_degraded: bool,
    pub dense_candidates: usize,
    pub bm25_chunk_candidates: usize,
    pub bm25_meta_doc_candidates: usize,
    pub fusion_pool_size: usize,
    pub avg_fused_score: f32,
    pub min_fused_score: f32,
    pub max_fused_score: f32,
    pub context_chars: usize,
}

#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub passages: Vec<cairn_core::RetrievedPassage>,
    pub diagnostics: RetrievalDiagnostics,
}

pub struct HybridRetriever {
    store: Arc<dyn IndexAdapter>,
    embedder: Arc<dyn Embedder>,
    config: RetrieverConfig,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn IndexAdapter>, embedder: Arc<dyn Embedder>, config: RetrieverConfig) -> Self {
        Self { store, embedder, config }
    }

    /// Run the full hybrid retrieval algorithm (spec §4.2 steps 1-6).
    #[instrument(skip(self, filter), fields(query_len = query_text.len()))]
    pub async fn retrieve(&self, query_text: &str, filter: Option<&Filter>) -> Result<RetrievalOutcome, RetrieveError> {
        let cfg = &self.config;

        // Step 1: dense embedding, delegated to the LLM collaborator. Failure degrades to
        // BM25-only mode rather than failing the request (spec §4.2).
        let embed_result = self.embedder.embed(query_text).await;
        let dense_degraded = embed_result.is_err();
        if let Err(e) = &embed_result {
            debug!(error = %e, "dense embedding unavailable; degrading to BM25-only");
        }

        // Step 2: fan out the three primary sub-retrievals concurrently.
        let dense_fut = async {
            match &embed_result {
                Ok(qv) => Some(self.store.knn(qv, cfg.k_embed, filter).await),
                Err(_) => None,
            }
        };
        let bm25_chunk_fut = self.store.bm25_chunk(query_text, cfg.k_bm25_chunk, filter);
        let bm25_meta_fut = self.store.bm25_meta(query_text, cfg.k_bm25_meta_docs, filter);

        let (dense_res, bm25_chunk_res, bm25_meta_res) = tokio::join!(dense_fut, bm25_chunk_fut, bm25_meta_fut);

        // `dense_attempted` is false only when the embedder itself failed (already recorded
        // as `dense_degraded`); a `Some(Err(_))` is a genuine backend failure of `knn`.
        let dense_errored = matches!(dense_res, Some(Err(_)));
        let list_a: Vec<(ChunkId, f32)> = match dense_res {
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                warn!(error = %e, "dense KNN failed; continuing without it");
                Vec::new()
            }
            None => Vec::new(),
        };
        let bm25_chunk_errored = bm25_chunk_res.is_err();
        let list_b: Vec<(ChunkId, f32)> = match bm25_chunk_res {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "chunk BM25 failed; continuing without it");
                Vec::new()
            }
        };
        let bm25_meta_errored = bm25_meta_res.is_err();
        let meta_docs: Vec<(DocId, f32)> = match bm25_meta_res {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "metadata BM25 failed; continuing without it");
                Vec::new()
            }
        };

        // Step 2 (continued): expand each metadata-matched document to its top `m` chunks
        // by per-doc BM25 score, scoping the query to that document via a `doc_id` filter.
        let mut list_c: Vec<(ChunkId, f32)> = Vec::new();
        let mut meta_expand_errored = false;
        for (doc_id, _score) in &meta_docs {
            let mut doc_filter = filter.cloned().unwrap_or_default();
            doc_filter.predicates.push(("doc_id".to_string(), cairn_core::filter::Predicate::Eq(doc_id.0.clone())));
            match self.store.bm25_chunk(query_text, cfg.m_chunks_per_meta_doc, Some(&doc_filter)).await {
                Ok(chunks) => list_c.extend(chunks),
                Err(e) => {
                    meta_expand_errored = true;
                    warn!(error = %e, doc_id = %doc_id, "per-document chunk expansion failed");
                }
            }
        }

        // Surface `RetrievalBackendFailure` only if every sub-retriever genuinely failed
        // (spec §4.2): dense embedding unavailable counts as a failed retriever here only
        // in combination with both BM25 paths erroring out — an empty-but-successful
        // result from any path is not a failure (spec §4.1).
        let dense_failed = dense_degraded || dense_errored;
        let bm25_failed = bm25_chunk_errored && (meta_docs.is_empty() || meta_expand_errored);
        if dense_failed && bm25_failed && bm25_meta_errored {
            return Err(RetrieveError::AllSubRetrieversFailed(
                "dense embedding unavailable and chunk/metadata BM25 both failed".into(),
            ));
        }

        // Step 3: fuse A, B, C with weighted RRF (weights folded into list membership; the
        // teacher's `rrf_fuse` treats all lists as weight 1.0, which this spec also does —
        // the per-modality weighting the teacher exposes via `RrfConfig` is not required
        // here since the spec names no per-list weight, only the fixed damping constant).
        let lists: Vec<&[(ChunkId, f32)]> = vec![&list_a, &list_b, &list_c];
        let fused_map = rrf_fuse(&lists, cfg.rrf_c);
        let fusion_pool_size = fused_map.len();

        // cap the fusion pool before the heuristic pass, keeping the highest-RRF members.
        let mut pool_sorted: Vec<(ChunkId, f32)> = fused_map.into_iter().collect();
        pool_sorted.sort_by(|(ida, sa), (idb, sb)| {
            sb.partial_cmp(sa).unwrap_or(std::cmp::Ordering::Equal).then_with(|| ida.cmp(idb))
        });
        pool_sorted.truncate(cfg.k_rrf);

        let dense_by_id: HashMap<&ChunkId, f32> = list_a.iter().map(|(id, s)| (id, *s)).collect();
        let bm25_chunk_by_id: HashMap<&ChunkId, f32> = list_b.iter().map(|(id, s)| (id, *s)).collect();
        // bm25_meta is document-scored; attribute it to its expanded chunks for diagnostics.
        let meta_score_by_doc: HashMap<&DocId, f32> = meta_docs.iter().map(|(id, s)| (id, *s)).collect();

        let rrf_values: Vec<f32> = pool_sorted.iter().map(|(_, s)| *s).collect();
        let median_rrf = median(&rrf_values);
        let now = Utc::now();

        // Step 4-5: resolve each pooled chunk, compute the heuristic adjustment, final
        // score, and tie-break ordering.
        let mut scored: Vec<(cairn_core::RetrievedPassage, f32)> = Vec::with_capacity(pool_sorted.len());
        for (chunk_id, rrf_score) in &pool_sorted {
            let resolved = match self.store.resolve(chunk_id).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, chunk_id = %chunk_id, "failed to resolve pooled chunk; skipping");
                    continue;
                }
            };
            let doc_id = resolved.chunk.doc_id.clone();
            let freshness = freshness_decay(resolved.document.updated_at, now, 180.0);
            let raw_heuristic = heuristic_term(
                &cfg.heuristic,
                resolved.document.authority_score(),
                resolved.chunk.contains_currency,
                resolved.chunk.contains_numbers,
                freshness,
            );
            let heuristic_adjustment = clamp_to_median_band(raw_heuristic, median_rrf);
            let final_score = rrf_score + heuristic_adjustment;

            let snapshot = cairn_core::passage::DocumentSnapshot {
                doc_id: doc_id.clone(),
                kind: resolved.document.kind,
                location: resolved.document.location.clone(),
                authority_score: resolved.document.authority_score(),
                categories: resolved.document.categories.clone(),
                product_entities: resolved.document.product_entities.clone(),
            };
            let scores = SignalScores {
                dense: dense_by_id.get(chunk_id).copied(),
                bm25_chunk: bm25_chunk_by_id.get(chunk_id).copied(),
                bm25_meta: meta_score_by_doc.get(&doc_id).copied(),
                heuristic: heuristic_adjustment,
            };
            let passage = cairn_core::RetrievedPassage::new(&resolved.chunk, snapshot, scores, final_score, 0);
            scored.push((passage, final_score));
        }

        // Step 5 (tie-break): sort by final score desc, then dense similarity desc, then
        // chunk identifier asc.
        scored.sort_by(|(pa, sa), (pb, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let da = pa.scores.dense.unwrap_or(f32::NEG_INFINITY);
                    let db = pb.scores.dense.unwrap_or(f32::NEG_INFINITY);
                    db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| pa.chunk_id.cmp(&pb.chunk_id))
        });
        scored.truncate(cfg.k_final);

        let context_chars = scored.iter().map(|(p, _)| p.text.len()).sum();
        let final_scores: Vec<f32> = scored.iter().map(|(_, s)| *s).collect();
        let (min_fused, max_fused, avg_fused) = if final_scores.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let min = final_scores.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = final_scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            let avg = final_scores.iter().sum::<f32>() / final_scores.len() as f32;
            (min, max, avg)
        };

        let passages: Vec<cairn_core::RetrievedPassage> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (mut p, _))| {
                p.rank = i + 1;
                p
            })
            .collect();

        let diagnostics = RetrievalDiagnostics {
            dense_degraded,
            dense_candidates: list_a.len(),
            bm25_chunk_candidates: list_b.len(),
            bm25_meta_doc_candidates: meta_docs.len(),
            fusion_pool_size,
            avg_fused_score: avg_fused,
            min_fused_score: min_fused,
            max_fused_score: max_fused,
            context_chars,
        };

        Ok(RetrievalOutcome { passages, diagnostics })
    }
}
