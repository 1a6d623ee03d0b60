//! Capability-set traits for the storage, extraction and retrieval roles:
//! one interface per role, three concrete retrievers, two extractors, three
//! stores, dispatch direct rather than reflective. These traits are that
//! dispatch boundary; concrete adapters live in `dotmd-storage`,
//! `dotmd-extract` and `dotmd-search`.

use crate::error::Result;
use crate::models::{Chunk, Edge, Entity, Extraction, File};
use async_trait::async_trait;

/// A chunk with its vector embedding, as written by the indexer and read
/// back by the dense retriever.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk_id: crate::ids::ChunkId,
    pub embedding: Vec<f32>,
}

/// Metadata store: the authoritative record of files and chunks.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn upsert_file(&self, file: &File) -> Result<()>;
    async fn get_file(&self, path: &str) -> Result<Option<File>>;
    async fn delete_file(&self, path: &str) -> Result<()>;
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<()>;
    async fn chunks_for_file(&self, path: &str) -> Result<Vec<Chunk>>;
    async fn get_chunk(&self, id: crate::ids::ChunkId) -> Result<Option<Chunk>>;
    async fn get_chunks(&self, ids: &[crate::ids::ChunkId]) -> Result<Vec<Chunk>>;
    async fn delete_chunks_for_file(&self, path: &str) -> Result<()>;
    async fn counts(&self) -> Result<(usize, usize)>; // (files, chunks)
    /// `(path, title)` for every known file; feeds the structural
    /// extractor's wikilink `TitleResolver` and the query expander's
    /// heading index.
    async fn list_titles(&self) -> Result<Vec<(String, String)>>;
    /// Every distinct chunk heading path in the corpus, used to build the
    /// query expander's heading-structure context.
    async fn list_heading_paths(&self) -> Result<Vec<Vec<String>>>;
    async fn clear(&self) -> Result<()>;
}

/// Dense vector store: the ANN index role.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// `file_path` scopes these rows for `delete_by_file`, mirroring
    /// `GraphStore::upsert_entities_and_edges`.
    async fn upsert(&self, file_path: &str, embeddings: &[EmbeddedChunk]) -> Result<()>;
    async fn delete_by_file(&self, path: &str) -> Result<()>;
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(crate::ids::ChunkId, f32)>>;
    async fn dimension(&self) -> Result<Option<usize>>;
    async fn clear(&self) -> Result<()>;
}

/// Sparse (BM25) index builder/searcher.
#[async_trait]
pub trait SparseIndex: Send + Sync {
    async fn remove_file(&self, path: &str) -> Result<()>;
    async fn stage(&self, chunk: &Chunk) -> Result<()>;
    /// Rebuild and persist the full corpus index (IDF requires a full view).
    async fn rebuild(&self) -> Result<()>;
    async fn search(&self, terms: &[String], limit: usize) -> Result<Vec<(crate::ids::ChunkId, f32)>>;
    async fn clear(&self) -> Result<()>;
}

/// Property graph store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn upsert_file_and_sections(&self, file: &File, chunks: &[Chunk]) -> Result<()>;
    /// `file_path` scopes the edges/entities to their owning file for later
    /// deletion; entities themselves are never deleted by this (they are
    /// global and GC'd separately), only the edges this file contributed.
    async fn upsert_entities_and_edges(
        &self,
        file_path: &str,
        entities: &[Entity],
        edges: &[Edge],
    ) -> Result<()>;
    async fn delete_file(&self, path: &str) -> Result<()>;
    /// BFS up to `max_hops` from `seeds`, returning chunks reachable via the
    /// graph edges and their accumulated traversal score.
    async fn traverse(
        &self,
        seeds: &[crate::ids::ChunkId],
        max_hops: u8,
    ) -> Result<Vec<(crate::ids::ChunkId, f32)>>;
    async fn counts(&self) -> Result<(usize, usize)>; // (entities, edges)
    /// Deletes every entity node with no incident edge. Not part of the hot
    /// ingestion path; invoked explicitly by maintenance (see
    /// `dotmd_index::maintenance::gc_orphan_entities`). Returns the number
    /// of entities removed.
    async fn delete_orphan_entities(&self) -> Result<usize>;
    async fn clear(&self) -> Result<()>;
}

/// One of the two extraction layers (structural, NER).
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self, chunk: &Chunk, file: &File, corpus: &dyn TitleResolver) -> Result<Extraction>;
}

/// Resolves a wikilink/markdown-link target against known file titles.
pub trait TitleResolver: Send + Sync {
    fn resolve_title(&self, title: &str) -> Option<String>;
}

/// One of the three retrieval engines.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &'static str;
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<(crate::ids::ChunkId, f32)>>;
}
