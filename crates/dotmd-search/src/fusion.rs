//! Reciprocal Rank Fusion: combine *n* ranked lists into one by rank alone,
//! never by raw score (the three engines' scores are not comparable).

use dotmd_core::ids::ChunkId;
use std::collections::HashMap;

pub const DEFAULT_K: f32 = 60.0;
pub const MAX_FUSED_CANDIDATES: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct EngineScores {
    pub dense: Option<f32>,
    pub sparse: Option<f32>,
    pub graph: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub chunk_id: ChunkId,
    pub rrf_score: f32,
    pub list_count: u8,
    pub engine_scores: EngineScores,
}

/// One named, already-ranked list of `(chunk_id, engine_score)` pairs.
pub struct RankedList<'a> {
    pub engine: &'a str,
    pub results: &'a [(ChunkId, f32)],
}

/// `Σ_l 1 / (k + rank_l(chunk))` over every list the chunk appears in
/// (0-based rank internally, so the first-ranked item scores `1/(k+1)`).
/// Ties broken by list count (descending) then chunk ID (ascending).
/// Returns at most `MAX_FUSED_CANDIDATES` candidates, commutative in the
/// order `lists` is given.
pub fn reciprocal_rank_fusion(lists: &[RankedList], k: f32) -> Vec<FusedCandidate> {
    let mut accum: HashMap<ChunkId, FusedCandidate> = HashMap::new();

    for list in lists {
        for (rank, (chunk_id, score)) in list.results.iter().enumerate() {
            let contribution = 1.0 / (k + (rank as f32 + 1.0));
            let entry = accum.entry(*chunk_id).or_insert_with(|| FusedCandidate {
                chunk_id: *chunk_id,
                rrf_score: 0.0,
                list_count: 0,
                engine_scores: EngineScores::default(),
            });
            entry.rrf_score += contribution;
            entry.list_count += 1;
            match list.engine {
                "dense" => entry.engine_scores.dense = Some(*score),
                "sparse" => entry.engine_scores.sparse = Some(*score),
                "graph" => entry.engine_scores.graph = Some(*score),
                _ => {}
            }
        }
    }

    let mut fused: Vec<FusedCandidate> = accum.into_values().collect();
    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.list_count.cmp(&a.list_count))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    fused.truncate(MAX_FUSED_CANDIDATES);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmd_core::ids::ChunkId as Id;

    #[test]
    fn rank_only_chunk_scores_one_over_k_plus_rank() {
        let dense = vec![(Id::new("a.md", 0), 0.9), (Id::new("b.md", 0), 0.5)];
        let lists = vec![RankedList {
            engine: "dense",
            results: &dense,
        }];
        let fused = reciprocal_rank_fusion(&lists, 60.0);
        assert_eq!(fused[0].chunk_id, Id::new("a.md", 0));
        assert!((fused[0].rrf_score - 1.0 / 61.0).abs() < 1e-6);
        assert!((fused[1].rrf_score - 1.0 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn commutative_in_list_order() {
        let dense = vec![(Id::new("a.md", 0), 0.9), (Id::new("b.md", 0), 0.5)];
        let sparse = vec![(Id::new("b.md", 0), 3.0), (Id::new("a.md", 0), 1.0)];
        let forward = reciprocal_rank_fusion(
            &[
                RankedList { engine: "dense", results: &dense },
                RankedList { engine: "sparse", results: &sparse },
            ],
            60.0,
        );
        let backward = reciprocal_rank_fusion(
            &[
                RankedList { engine: "sparse", results: &sparse },
                RankedList { engine: "dense", results: &dense },
            ],
            60.0,
        );
        let forward_ids: Vec<_> = forward.iter().map(|f| f.chunk_id).collect();
        let backward_ids: Vec<_> = backward.iter().map(|f| f.chunk_id).collect();
        assert_eq!(forward_ids, backward_ids);
    }

    #[test]
    fn chunk_in_more_lists_ranks_above_equal_score_single_list_chunk() {
        let dense = vec![(Id::new("a.md", 0), 0.9)];
        let sparse = vec![(Id::new("a.md", 0), 2.0), (Id::new("b.md", 0), 2.0)];
        let fused = reciprocal_rank_fusion(
            &[
                RankedList { engine: "dense", results: &dense },
                RankedList { engine: "sparse", results: &sparse },
            ],
            60.0,
        );
        assert_eq!(fused[0].chunk_id, Id::new("a.md", 0));
        assert_eq!(fused[0].list_count, 2);
    }
}
