//! Request/response shapes for the search pipeline.

use crate::fusion::EngineScores;
use dotmd_core::ids::ChunkId;
use dotmd_core::SearchMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub top_k: usize,
    pub rerank: bool,
    pub expand: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            top_k: 10,
            rerank: true,
            expand: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub file_path: String,
    pub heading_path: Vec<String>,
    pub snippet: String,
    pub score: f32,
    pub engine_scores: EngineScoresDto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineScoresDto {
    pub dense: Option<f32>,
    pub sparse: Option<f32>,
    pub graph: Option<f32>,
}

impl From<EngineScores> for EngineScoresDto {
    fn from(e: EngineScores) -> Self {
        Self {
            dense: e.dense,
            sparse: e.sparse,
            graph: e.graph,
        }
    }
}

/// An internal candidate carried between fusion and reranking, before the
/// result is shaped for the caller.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub file_path: String,
    pub heading_path: Vec<String>,
    pub text: String,
    pub fused_score: f32,
    pub engine_scores: EngineScores,
}
