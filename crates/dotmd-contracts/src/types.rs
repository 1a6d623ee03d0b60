//! Request and response contracts shared between the CLI and the
//! `dotmd-indexer` service's HTTP and JSON-RPC surfaces, so both adapters
//! serialize the same shapes the core engine returns.

use serde::{Deserialize, Serialize};

/// Standard envelope returned by every HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Standard API error structure, mirroring `DotmdError`'s variants without
/// depending on `dotmd-core` directly (the service adapter does the
/// translation; see its `error.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// `index(directory, options)` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRequest {
    pub directory: String,
    #[serde(default)]
    pub force: bool,
    /// Wall-clock budget for the run, in seconds; unset means unbounded.
    pub deadline_secs: Option<u64>,
}

/// `index(...)` response: the `IndexSummary` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub files_indexed: usize,
    pub files_failed: usize,
    pub chunks: usize,
    pub entities: usize,
    pub edges: usize,
    pub errors: Vec<String>,
}

/// `search(query, options)` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// One of `hybrid`, `semantic`, `bm25`, `graph`; defaults to `hybrid`.
    pub mode: Option<String>,
    pub top_k: Option<usize>,
    pub rerank: Option<bool>,
    pub expand: Option<bool>,
}

/// A single ranked result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultDto {
    pub chunk_id: String,
    pub file_path: String,
    pub heading_path: Vec<String>,
    pub snippet: String,
    pub score: f32,
    pub dense_score: Option<f32>,
    pub sparse_score: Option<f32>,
    pub graph_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResultDto>,
    pub total: usize,
}

/// `status()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub files: usize,
    pub chunks: usize,
    pub entities: usize,
    pub edges: usize,
    pub last_indexed: Option<String>,
}

/// `clear()` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
}
