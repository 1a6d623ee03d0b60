//! Dual-mode client: drives the engine in-process by default, or talks to
//! a running `dotmd-indexer` service over HTTP when `--server` is passed.
//! One enum so every command works unmodified against either backend.

use anyhow::{anyhow, Context, Result};
use dotmd_config::AppConfig;
use dotmd_contracts::{
    ClearResponse, IndexRequest, IndexResponse, SearchRequest, SearchResponse, SearchResultDto,
    StatusResponse,
};
use dotmd_core::SearchMode;
use dotmd_index::{Engine, IndexOptions};
use dotmd_search::SearchOptions;
use std::str::FromStr;
use std::time::Duration;

pub enum Client {
    InProcess(Engine),
    Http { base_url: String, http: reqwest::Client },
}

impl Client {
    pub async fn in_process(config: AppConfig) -> Result<Self> {
        let models = crate::bootstrap::load_models(&config)?;
        let engine = Engine::open(config, models).context("opening dotmd index")?;
        Ok(Self::InProcess(engine))
    }

    pub fn http(base_url: String) -> Result<Self> {
        Ok(Self::Http {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub async fn index(&self, directory: &str, force: bool, deadline_secs: Option<u64>) -> Result<IndexResponse> {
        match self {
            Self::InProcess(engine) => {
                let options = IndexOptions {
                    force,
                    deadline: deadline_secs.map(Duration::from_secs),
                };
                let summary = engine.index(std::path::Path::new(directory), options).await?;
                Ok(IndexResponse {
                    files_indexed: summary.files_indexed,
                    files_failed: summary.files_failed,
                    chunks: summary.chunks,
                    entities: summary.entities,
                    edges: summary.edges,
                    errors: summary.errors,
                })
            }
            Self::Http { base_url, http } => {
                let request = IndexRequest {
                    directory: directory.to_string(),
                    force,
                    deadline_secs,
                };
                post(http, base_url, dotmd_contracts::endpoints::INDEX, &request).await
            }
        }
    }

    pub async fn search(
        &self,
        query: &str,
        mode: Option<String>,
        top_k: Option<usize>,
        rerank: Option<bool>,
        expand: Option<bool>,
    ) -> Result<SearchResponse> {
        match self {
            Self::InProcess(engine) => {
                let mut options = SearchOptions::default();
                if let Some(mode) = &mode {
                    options.mode = SearchMode::from_str(mode).map_err(|e| anyhow!(e.to_string()))?;
                }
                if let Some(top_k) = top_k {
                    options.top_k = top_k;
                }
                if let Some(rerank) = rerank {
                    options.rerank = rerank;
                }
                if let Some(expand) = expand {
                    options.expand = expand;
                }
                let results = engine.search(query, options).await?;
                Ok(SearchResponse {
                    query: query.to_string(),
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
                })
            }
            Self::Http { base_url, http } => {
                let request = SearchRequest {
                    query: query.to_string(),
                    mode,
                    top_k,
                    rerank,
                    expand,
                };
                post(http, base_url, dotmd_contracts::endpoints::SEARCH, &request).await
            }
        }
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        match self {
            Self::InProcess(engine) => {
                let status = engine.status().await?;
                Ok(StatusResponse {
                    files: status.files,
                    chunks: status.chunks,
                    entities: status.entities,
                    edges: status.edges,
                    last_indexed: status.last_indexed.map(|t| t.to_rfc3339()),
                })
            }
            Self::Http { base_url, http } => get(http, base_url, dotmd_contracts::endpoints::STATUS).await,
        }
    }

    pub async fn clear(&self) -> Result<ClearResponse> {
        match self {
            Self::InProcess(engine) => {
                engine.clear().await?;
                Ok(ClearResponse { success: true })
            }
            Self::Http { base_url, http } => post(http, base_url, dotmd_contracts::endpoints::CLEAR, &()).await,
        }
    }

    /// Orphan-entity GC is a maintenance operation, not part of the
    /// tool-protocol surface; it only runs against an in-process engine.
    pub async fn gc(&self) -> Result<usize> {
        match self {
            Self::InProcess(engine) => Ok(engine.gc().await?),
            Self::Http { .. } => Err(anyhow!(
                "gc is not exposed by the dotmd-indexer service; run `dotmd gc` without --server"
            )),
        }
    }
}

async fn post<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    base_url: &str,
    path: &str,
    body: &Req,
) -> Result<Resp> {
    let response = http
        .post(format!("{base_url}{path}"))
        .json(body)
        .send()
        .await
        .with_context(|| format!("requesting {path}"))?;
    unwrap_envelope(response).await
}

async fn get<Resp: serde::de::DeserializeOwned>(http: &reqwest::Client, base_url: &str, path: &str) -> Result<Resp> {
    let response = http
        .get(format!("{base_url}{path}"))
        .send()
        .await
        .with_context(|| format!("requesting {path}"))?;
    unwrap_envelope(response).await
}

async fn unwrap_envelope<Resp: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<Resp> {
    let envelope: dotmd_contracts::ApiResponse<Resp> = response.json().await.context("decoding response body")?;
    if let Some(data) = envelope.data {
        Ok(data)
    } else {
        let err = envelope.error.unwrap_or_else(|| dotmd_contracts::ApiError::new("unknown", "unknown error"));
        Err(anyhow!("{}: {}", err.code, err.message))
    }
}
