//! `RetrieverConfig` (spec §4.2 "Configuration (enumerated)").

use serde::{Deserialize, Serialize};

/// Heuristic adjustment weights (spec §4.2 step 4). Defaults fixed per `SPEC_FULL.md` §12:
/// small enough that the additive term rarely needs the ±20%-of-median-RRF clamp, large
/// enough to break ties toward a higher-authority, fresher passage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeuristicWeights {
    pub w_auth: f32,
    pub w_cur: f32,
    pub w_num: f32,
    pub w_fresh: f32,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            w_auth: 0.10,
            w_cur: 0.05,
            w_num: 0.03,
            w_fresh: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    /// Candidates drawn from dense KNN.
    pub k_embed: usize,
    /// Candidates drawn from chunk BM25.
    pub k_bm25_chunk: usize,
    /// Documents drawn from metadata BM25 (expanded to chunks, not a chunk count).
    pub k_bm25_meta_docs: usize,
    /// Top chunks pulled per metadata-matched document before they join the fusion pool.
    pub m_chunks_per_meta_doc: usize,
    /// Size of the fusion pool retained for scoring (after union, before final truncation).
    pub k_rrf: usize,
    /// Size of the list returned to the caller.
    pub k_final: usize,
    /// RRF damping constant (spec default 60).
    pub rrf_c: f32,
    pub heuristic: HeuristicWeights,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            k_embed: 20,
            k_bm25_chunk: 20,
            k_bm25_meta_docs: 10,
            m_chunks_per_meta_doc: 3,
            k_rrf: 50,
            k_final: 8,
            rrf_c: 60.0,
            heuristic: HeuristicWeights::default(),
        }
    }
}
