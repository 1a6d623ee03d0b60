//! Protocol-independent request handlers: both the HTTP router and the
//! JSON-RPC dispatcher call into these, so `search`/`index`/`status`/`clear`
//! behave identically over either transport.

use dotmd_contracts::{ClearResponse, IndexRequest, IndexResponse, SearchRequest, SearchResponse, SearchResultDto, StatusResponse};
use dotmd_core::{DotmdError, Result, SearchMode};
use dotmd_index::{Engine, IndexOptions};
use dotmd_search::SearchOptions;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub async fn handle_index(state: &AppState, request: IndexRequest) -> Result<IndexResponse> {
    let options = IndexOptions {
        force: request.force,
        deadline: request.deadline_secs.map(Duration::from_secs),
    };
    let summary = state.engine.index(std::path::Path::new(&request.directory), options).await?;
    Ok(IndexResponse {
        files_indexed: summary.files_indexed,
        files_failed: summary.files_failed,
        chunks: summary.chunks,
        entities: summary.entities,
        edges: summary.edges,
        errors: summary.errors,
    })
}

pub async fn handle_search(state: &AppState, request: SearchRequest) -> Result<SearchResponse> {
    let mut options = SearchOptions::default();
    if let Some(mode) = &request.mode {
        options.mode = SearchMode::from_str(mode)?;
    }
    if let Some(top_k) = request.top_k {
        options.top_k = top_k;
    }
    if let Some(rerank) = request.rerank {
        options.rerank = rerank;
    }
    if let Some(expand) = request.expand {
        options.expand = expand;
    }

    let results = state.engine.search(&request.query, options).await?;
    Ok(SearchResponse {
        total: results.len(),
        results: results
            .into_iter()
            .map(|r| SearchResultDto {
                chunk_id: r.chunk_id,
                file_path: r.file_path,
                heading_path: r.heading_path,
                snippet: r.snippet,
                score: r.score,
                dense_score: r.engine_scores.dense,
                sparse_score: r.engine_scores.sparse,
                graph_score: r.engine_scores.graph,
            })
            .collect(),
        query: request.query,
    })
}

pub async fn handle_status(state: &AppState) -> Result<StatusResponse> {
    let status = state.engine.status().await?;
    Ok(StatusResponse {
        files: status.files,
        chunks: status.chunks,
        entities: status.entities,
        edges: status.edges,
        last_indexed: status.last_indexed.map(|t| t.to_rfc3339()),
    })
}

pub async fn handle_clear(state: &AppState) -> Result<ClearResponse> {
    state.engine.clear().await?;
    Ok(ClearResponse { success: true })
}

/// Maps a `DotmdError` onto a stable string code, shared by the HTTP status
/// mapping and the JSON-RPC error mapping so the two never drift.
pub fn error_code(error: &DotmdError) -> &'static str {
    match error {
        DotmdError::Read { .. } => "read_error",
        DotmdError::Parse { .. } => "parse_error",
        DotmdError::IndexWrite { .. } => "index_write_error",
        DotmdError::ModelMismatch { .. } => "model_mismatch",
        DotmdError::IndexMissing { .. } => "index_missing",
        DotmdError::Cancelled => "cancelled",
        DotmdError::Config { .. } => "config_error",
        DotmdError::Internal { .. } => "internal_error",
    }
}
