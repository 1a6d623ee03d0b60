//! The three independent scoring engines. Dense and sparse both reduce
//! naturally to the generic `Retriever` trait's `(query, limit)` shape; the
//! graph retriever's natural input is a seed set, not a query string, so it
//! exposes its own `retrieve_seeded` rather than forcing that shape through
//! the trait.

use async_trait::async_trait;
use dotmd_core::ids::ChunkId;
use dotmd_core::tokenize_terms;
use dotmd_core::traits::{GraphStore, Retriever, SparseIndex, VectorStore};
use dotmd_core::Result;
use dotmd_models::Embedder;
use std::sync::Arc;

pub struct DenseRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl DenseRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    fn name(&self) -> &'static str {
        "dense"
    }

    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<(ChunkId, f32)>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.embedder.embed_batch(&[query.to_string()]).await?;
        let Some(vector) = embeddings.into_iter().next() else {
            return Ok(Vec::new());
        };
        self.store.search(&vector, limit).await
    }
}

pub struct SparseRetriever {
    index: Arc<dyn SparseIndex>,
}

impl SparseRetriever {
    pub fn new(index: Arc<dyn SparseIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    fn name(&self) -> &'static str {
        "sparse"
    }

    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<(ChunkId, f32)>> {
        let terms = tokenize_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        self.index.search(&terms, limit).await
    }
}

pub struct GraphRetriever {
    store: Arc<dyn GraphStore>,
    max_hops: u8,
}

impl GraphRetriever {
    pub fn new(store: Arc<dyn GraphStore>, max_hops: u8) -> Self {
        Self { store, max_hops }
    }

    pub fn name(&self) -> &'static str {
        "graph"
    }

    /// Traverses from `seeds` (typically the union of dense+sparse top
    /// results, capped at the configured seed budget). Empty seeds yields
    /// empty results, never an error.
    pub async fn retrieve_seeded(&self, seeds: &[ChunkId], limit: usize) -> Result<Vec<(ChunkId, f32)>> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = self.store.traverse(seeds, self.max_hops).await?;
        results.truncate(limit);
        Ok(results)
    }
}
