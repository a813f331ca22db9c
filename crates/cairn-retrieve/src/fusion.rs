//! Score fusion: weighted Reciprocal Rank Fusion plus the heuristic adjustment term
//! (spec §4.2 steps 3-5).
//!
//! The RRF accumulator mirrors `ploke_rag::fusion::rrf_fuse` (`HashMap` accumulate, 1-based
//! ranks, missing-from-a-list contributes 0) widened from two input lists to an arbitrary
//! number, since the spec fuses three (`dense`, `bm25_chunk`, `bm25_meta`-expanded). The
//! heuristic term and its clamp have no teacher equivalent; they are new code written in
//! the same pure-function, no-I/O style as the rest of this module.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::config::HeuristicWeights;

/// Weighted RRF across any number of ranked lists. Each list is assumed already sorted by
/// descending relevance (1-based rank = position + 1). A passage absent from a list
/// contributes 0 from it.
pub fn rrf_fuse<Id: Eq + Hash + Clone>(lists: &[&[(Id, f32)]], c: f32) -> HashMap<Id, f32> {
    let mut fused: HashMap<Id, f32> = HashMap::new();
    for list in lists {
        for (i, (id, _)) in list.iter().enumerate() {
            let rank = (i as f32) + 1.0;
            let add = 1.0 / (c + rank);
            *fused.entry(id.clone()).or_insert(0.0) += add;
        }
    }
    fused
}

/// Exponential freshness decay: 1.0 for a document updated today, halving every
/// `half_life_days`. A document with no `updated_at` gets a neutral 0.5 — neither
/// rewarded nor penalized, since staleness is unknown rather than confirmed.
pub fn freshness_decay(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>, half_life_days: f64) -> f32 {
    match updated_at {
        None => 0.5,
        Some(ts) => {
            let elapsed_days = (now - ts).num_seconds() as f64 / 86_400.0;
            let elapsed_days = elapsed_days.max(0.0);
            0.5f64.powf(elapsed_days / half_life_days).clamp(0.0, 1.0) as f32
        }
    }
}

/// The single additive heuristic term of spec §4.2 step 4, before clamping.
#[allow(clippy::too_many_arguments)]
pub fn heuristic_term(
    weights: &HeuristicWeights,
    authority_score: f64,
    has_currency: bool,
    has_numbers: bool,
    freshness: f32,
) -> f32 {
    (authority_score as f32) * weights.w_auth
        + if has_currency { weights.w_cur } else { 0.0 }
        + if has_numbers { weights.w_num } else { 0.0 }
        + freshness * weights.w_fresh
}

/// Clamp a heuristic adjustment to ±20% of the median fused RRF score in the pool (spec
/// §4.2 step 4). With an empty or all-zero pool the clamp collapses to 0.
pub fn clamp_to_median_band(raw: f32, median_rrf: f32) -> f32 {
    let bound = (median_rrf.abs() * 0.20).max(0.0);
    raw.clamp(-bound, bound)
}

/// Median of a slice of scores (not mutated in place; the caller's slice is copied).
pub fn median(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rrf_fuse_never_produces_a_nonpositive_score(
            a in prop::collection::vec(0u32..50, 0..12),
            b in prop::collection::vec(0u32..50, 0..12),
            c in 1.0f32..200.0,
        ) {
            let a: Vec<(u32, f32)> = a.into_iter().map(|id| (id, 0.0)).collect();
            let b: Vec<(u32, f32)> = b.into_iter().map(|id| (id, 0.0)).collect();
            let fused = rrf_fuse(&[&a, &b], c);
            for score in fused.values() {
                prop_assert!(*score > 0.0);
            }
        }

        #[test]
        fn rrf_fuse_preserves_every_id_seen_in_any_input_list(
            a in prop::collection::vec(0u32..50, 0..12),
            b in prop::collection::vec(0u32..50, 0..12),
        ) {
            let a_pairs: Vec<(u32, f32)> = a.iter().map(|id| (*id, 0.0)).collect();
            let b_pairs: Vec<(u32, f32)> = b.iter().map(|id| (*id, 0.0)).collect();
            let fused = rrf_fuse(&[&a_pairs, &b_pairs], 60.0);
            for id in a.iter().chain(b.iter()) {
                prop_assert!(fused.contains_key(id));
            }
        }

        #[test]
        fn clamp_never_exceeds_twenty_percent_of_median_magnitude(
            raw in -1000.0f32..1000.0,
            median_rrf in -1000.0f32..1000.0,
        ) {
            let clamped = clamp_to_median_band(raw, median_rrf);
            let bound = median_rrf.abs() * 0.20;
            prop_assert!(clamped.abs() <= bound + 1e-4);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_fuse_accumulates_across_lists_with_1_based_ranks() {
        let a: Vec<(&str, f32)> = vec![("x", 0.9), ("y", 0.5)];
        let b: Vec<(&str, f32)> = vec![("y", 0.8), ("z", 0.3)];
        let fused = rrf_fuse(&[&a, &b], 60.0);
        // y appears at rank 2 in `a` and rank 1 in `b`: 1/62 + 1/61
        let expected_y = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[&"y"] - expected_y).abs() < 1e-6);
        assert!(fused.contains_key(&"x"));
        assert!(fused.contains_key(&"z"));
    }

    #[test]
    fn freshness_decay_is_one_at_zero_elapsed_and_decays() {
        let now = Utc::now();
        assert!((freshness_decay(Some(now), now, 180.0) - 1.0).abs() < 1e-6);
        let stale = now - chrono::Duration::days(180);
        assert!((freshness_decay(Some(stale), now, 180.0) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn clamp_bounds_adjustment_to_twenty_percent_of_median() {
        assert_eq!(clamp_to_median_band(1.0, 0.1), 0.02);
        assert_eq!(clamp_to_median_band(-1.0, 0.1), -0.02);
        assert_eq!(clamp_to_median_band(0.01, 0.1), 0.01);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }
}
