//! Orchestrates the full query pipeline: expand, fan out across retrievers,
//! fuse by reciprocal rank, rerank. Mirrors the indexer's per-file ordering
//! guarantee on the query side: deterministic output for a fixed index
//! snapshot, concurrency only ever affecting wall-clock, never ordering.

use crate::expand::QueryExpander;
use crate::fusion::{reciprocal_rank_fusion, RankedList, DEFAULT_K};
use crate::models::{Candidate, EngineScoresDto, SearchOptions, SearchResult};
use crate::rerank::{extract_snippet, Reranker};
use crate::retrievers::{DenseRetriever, GraphRetriever, SparseRetriever};
use dotmd_core::ids::ChunkId;
use dotmd_core::traits::{MetadataStore, Retriever};
use dotmd_core::{Result, SearchMode};
use std::collections::HashSet;
use std::sync::Arc;

pub struct SearchPipeline {
    metadata: Arc<dyn MetadataStore>,
    dense: DenseRetriever,
    sparse: SparseRetriever,
    graph: GraphRetriever,
    expander: QueryExpander,
    reranker: Option<Reranker>,
    seed_budget: usize,
    rrf_k: f32,
}

impl SearchPipeline {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        dense: DenseRetriever,
        sparse: SparseRetriever,
        graph: GraphRetriever,
        expander: QueryExpander,
        reranker: Option<Reranker>,
        seed_budget: usize,
        rrf_k: f32,
    ) -> Self {
        Self {
            metadata,
            dense,
            sparse,
            graph,
            expander,
            reranker,
            seed_budget,
            rrf_k: if rrf_k > 0.0 { rrf_k } else { DEFAULT_K },
        }
    }

    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let expanded = if options.expand {
            self.expander.expand(query)
        } else {
            query.to_string()
        };

        let fetch_limit = options.top_k.max(crate::fusion::MAX_FUSED_CANDIDATES);

        let dense_results = if matches!(options.mode, SearchMode::Hybrid | SearchMode::Semantic | SearchMode::Graph) {
            self.dense.retrieve(&expanded, fetch_limit).await?
        } else {
            Vec::new()
        };
        let sparse_results = if matches!(options.mode, SearchMode::Hybrid | SearchMode::Bm25 | SearchMode::Graph) {
            self.sparse.retrieve(&expanded, fetch_limit).await?
        } else {
            Vec::new()
        };

        let graph_results = if matches!(options.mode, SearchMode::Hybrid | SearchMode::Graph) {
            let seeds = seed_union(&dense_results, &sparse_results, self.seed_budget);
            self.graph.retrieve_seeded(&seeds, fetch_limit).await?
        } else {
            Vec::new()
        };

        let fused_candidates = match options.mode {
            SearchMode::Hybrid => {
                let lists = [
                    RankedList { engine: "dense", results: &dense_results },
                    RankedList { engine: "sparse", results: &sparse_results },
                    RankedList { engine: "graph", results: &graph_results },
                ];
                reciprocal_rank_fusion(&lists, self.rrf_k)
            }
            SearchMode::Semantic => {
                let lists = [RankedList { engine: "dense", results: &dense_results }];
                reciprocal_rank_fusion(&lists, self.rrf_k)
            }
            SearchMode::Bm25 => {
                let lists = [RankedList { engine: "sparse", results: &sparse_results }];
                reciprocal_rank_fusion(&lists, self.rrf_k)
            }
            SearchMode::Graph => {
                let lists = [RankedList { engine: "graph", results: &graph_results }];
                reciprocal_rank_fusion(&lists, self.rrf_k)
            }
        };

        if fused_candidates.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_ids: Vec<ChunkId> = fused_candidates.iter().map(|c| c.chunk_id).collect();
        let chunks = self.metadata.get_chunks(&chunk_ids).await?;
        let chunk_by_id: std::collections::HashMap<ChunkId, _> =
            chunks.into_iter().map(|c| (c.id, c)).collect();

        let candidates: Vec<Candidate> = fused_candidates
            .into_iter()
            .filter_map(|fused| {
                let chunk = chunk_by_id.get(&fused.chunk_id)?;
                Some(Candidate {
                    chunk_id: fused.chunk_id,
                    file_path: chunk.file_path.clone(),
                    heading_path: chunk.heading_path.clone(),
                    text: chunk.text.clone(),
                    fused_score: fused.rrf_score,
                    engine_scores: fused.engine_scores,
                })
            })
            .collect();

        match (&self.reranker, options.rerank) {
            (Some(reranker), true) => reranker.rerank(query, candidates, options.top_k).await,
            _ => Ok(candidates
                .into_iter()
                .take(options.top_k)
                .map(|c| SearchResult {
                    chunk_id: c.chunk_id.to_string(),
                    snippet: extract_snippet(&c.text, query),
                    score: c.fused_score,
                    file_path: c.file_path,
                    heading_path: c.heading_path,
                    engine_scores: EngineScoresDto::from(c.engine_scores),
                })
                .collect()),
        }
    }
}

/// Union of the top results of both lists, up to `budget` seeds, ordered by
/// first appearance (dense before sparse) for determinism.
fn seed_union(dense: &[(ChunkId, f32)], sparse: &[(ChunkId, f32)], budget: usize) -> Vec<ChunkId> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for (id, _) in dense.iter().chain(sparse.iter()) {
        if seeds.len() >= budget {
            break;
        }
        if seen.insert(*id) {
            seeds.push(*id);
        }
    }
    seeds
}
