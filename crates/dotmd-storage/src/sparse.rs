//! The serialised BM25 sparse index. Unlike the metadata and vector stores,
//! BM25's IDF term needs a full corpus view, so chunks are staged in memory
//! during a batch and the whole index is rebuilt and persisted once at the
//! end — never incrementally per chunk (see the indexer's step 4).

use async_trait::async_trait;
use dotmd_config::Bm25Params;
use dotmd_core::ids::ChunkId;
use dotmd_core::models::Chunk;
use dotmd_core::tokenize_terms;
use dotmd_core::traits::SparseIndex;
use dotmd_core::{DotmdError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocEntry {
    file_path: String,
    term_counts: HashMap<String, u32>,
    length: u32,
}

/// The on-disk shape of `bm25_index.bin`: corpus tokens (per-document term
/// counts, from which the IDF table is derivable) plus the frozen BM25
/// parameters, keyed by chunk ID so the chunk_id <-> doc_index mapping
/// never needs its own table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SerializedIndex {
    params: Bm25ParamsDto,
    docs: HashMap<String, DocEntry>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Bm25ParamsDto {
    k1: f32,
    b: f32,
}

impl From<Bm25Params> for Bm25ParamsDto {
    fn from(p: Bm25Params) -> Self {
        Self { k1: p.k1, b: p.b }
    }
}

impl Default for Bm25ParamsDto {
    fn default() -> Self {
        Bm25Params::default().into()
    }
}

pub struct Bm25SparseIndex {
    path: Option<PathBuf>,
    params: Bm25Params,
    state: RwLock<SerializedIndex>,
}

impl Bm25SparseIndex {
    pub fn open(path: &Path, params: Bm25Params) -> Result<Self> {
        let state = if path.exists() {
            let bytes = std::fs::read(path)
                .map_err(|e| DotmdError::read(path.display().to_string(), e.to_string()))?;
            bincode::deserialize(&bytes)
                .map_err(|e| DotmdError::parse(path.display().to_string(), e.to_string()))?
        } else {
            SerializedIndex {
                params: params.into(),
                docs: HashMap::new(),
            }
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            params,
            state: RwLock::new(state),
        })
    }

    pub fn in_memory(params: Bm25Params) -> Self {
        Self {
            path: None,
            params,
            state: RwLock::new(SerializedIndex {
                params: params.into(),
                docs: HashMap::new(),
            }),
        }
    }

    fn persist(&self, state: &SerializedIndex) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("bm25", e.to_string()))?;
        }
        let bytes = bincode::serialize(state)
            .map_err(|e| DotmdError::index_write("bm25", e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| DotmdError::index_write("bm25", e.to_string()))
    }
}

#[async_trait]
impl SparseIndex for Bm25SparseIndex {
    async fn remove_file(&self, path: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.docs.retain(|_, doc| doc.file_path != path);
        Ok(())
    }

    async fn stage(&self, chunk: &Chunk) -> Result<()> {
        let terms = tokenize_terms(&chunk.text);
        let mut term_counts = HashMap::new();
        for term in &terms {
            *term_counts.entry(term.clone()).or_insert(0u32) += 1;
        }
        let mut state = self.state.write().await;
        state.docs.insert(
            chunk.id.to_string(),
            DocEntry {
                file_path: chunk.file_path.clone(),
                term_counts,
                length: terms.len() as u32,
            },
        );
        Ok(())
    }

    async fn rebuild(&self) -> Result<()> {
        let state = self.state.read().await;
        self.persist(&state)
    }

    async fn search(&self, terms: &[String], limit: usize) -> Result<Vec<(ChunkId, f32)>> {
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        if state.docs.is_empty() {
            return Ok(Vec::new());
        }

        let n = state.docs.len() as f32;
        let avgdl = state.docs.values().map(|d| d.length as f32).sum::<f32>() / n;

        let query_terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let mut df: HashMap<&str, f32> = HashMap::new();
        for term in &query_terms {
            let count = state
                .docs
                .values()
                .filter(|d| d.term_counts.contains_key(term))
                .count() as f32;
            df.insert(term.as_str(), count);
        }

        let k1 = self.params.k1;
        let b = self.params.b;

        let mut scored: Vec<(ChunkId, f32)> = Vec::new();
        for (id_str, doc) in state.docs.iter() {
            let Ok(chunk_id) = ChunkId::from_str(id_str) else {
                continue;
            };
            let mut score = 0.0f32;
            for term in &query_terms {
                let freq = *doc.term_counts.get(term).unwrap_or(&0) as f32;
                if freq == 0.0 {
                    continue;
                }
                let doc_freq = *df.get(term.as_str()).unwrap_or(&0.0);
                let idf = ((n - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln();
                let denom = freq + k1 * (1.0 - b + b * (doc.length as f32 / avgdl.max(1.0)));
                score += idf * (freq * (k1 + 1.0)) / denom.max(f32::EPSILON);
            }
            if score > 0.0 {
                scored.push((chunk_id, score));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.docs.clear();
        self.persist(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmd_core::ids::ChunkId as Id;

    fn chunk(path: &str, ordinal: usize, text: &str) -> Chunk {
        Chunk {
            id: Id::new(path, ordinal),
            file_path: path.to_string(),
            ordinal,
            heading_path: vec![],
            text: text.to_string(),
            start_offset: 0,
            end_offset: text.len(),
            token_count: text.split_whitespace().count(),
        }
    }

    #[tokio::test]
    async fn scores_documents_containing_query_terms_higher() {
        let index = Bm25SparseIndex::in_memory(Bm25Params::default());
        index
            .stage(&chunk("a.md", 0, "transformers use attention mechanisms"))
            .await
            .unwrap();
        index
            .stage(&chunk("b.md", 0, "cooking pasta with tomato sauce"))
            .await
            .unwrap();
        index.rebuild().await.unwrap();

        let results = index
            .search(&["attention".to_string(), "mechanism".to_string()], 10)
            .await
            .unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, Id::new("a.md", 0));
    }

    #[tokio::test]
    async fn empty_query_returns_empty() {
        let index = Bm25SparseIndex::in_memory(Bm25Params::default());
        index.stage(&chunk("a.md", 0, "some text")).await.unwrap();
        index.rebuild().await.unwrap();

        let results = index.search(&[], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn remove_file_drops_its_documents_from_search() {
        let index = Bm25SparseIndex::in_memory(Bm25Params::default());
        index
            .stage(&chunk("a.md", 0, "attention is all you need"))
            .await
            .unwrap();
        index.rebuild().await.unwrap();
        index.remove_file("a.md").await.unwrap();

        let results = index.search(&["attention".to_string()], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn index_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bm25_index.bin");
        {
            let index = Bm25SparseIndex::open(&path, Bm25Params::default()).unwrap();
            index
                .stage(&chunk("a.md", 0, "attention is all you need"))
                .await
                .unwrap();
            index.rebuild().await.unwrap();
        }
        let reopened = Bm25SparseIndex::open(&path, Bm25Params::default()).unwrap();
        let results = reopened.search(&["attention".to_string()], 10).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
