//! The per-file ingestion pipeline: chunk, extract, then write to all four
//! stores in a fixed order (graph sections, metadata chunks, vectors,
//! sparse staging, graph entities/edges), so no store ever observes a
//! dangling reference to a chunk another store hasn't written yet.

use dotmd_core::models::{Chunk, Edge, Entity, File};
use dotmd_core::traits::{
    EmbeddedChunk, Extractor, GraphStore, MetadataStore, SparseIndex, TitleResolver, VectorStore,
};
use dotmd_core::{DotmdError, Result};
use dotmd_document::tokens::TokenCounter;
use dotmd_document::{Chunker, ChunkerConfig, DiscoveredFile};
use dotmd_models::Embedder;
use std::sync::Arc;
use tracing::debug;

/// Everything a single file's pipeline run needs; cheap to clone (all `Arc`)
/// so the worker pool can hand one per spawned task.
#[derive(Clone)]
pub struct PipelineDeps {
    pub metadata: Arc<dyn MetadataStore>,
    pub vector: Arc<dyn VectorStore>,
    pub sparse: Arc<dyn SparseIndex>,
    pub graph: Arc<dyn GraphStore>,
    pub embedder: Arc<dyn Embedder>,
    /// Tokenises exactly the way `embedder` does, so chunk boundaries line
    /// up with the configured token bound (see `OnnxEmbedder::token_counter`).
    pub counter: Arc<dyn TokenCounter>,
    pub extractors: Vec<Arc<dyn Extractor>>,
    pub chunker_config: ChunkerConfig,
    pub embed_batch_size: usize,
}

/// Outcome of running one file through the pipeline.
#[derive(Debug)]
pub enum FileOutcome {
    /// Checksum unchanged; nothing written.
    Unchanged,
    Indexed {
        chunks: usize,
        entities: usize,
        edges: usize,
    },
    Failed { step: String, error: DotmdError },
}

/// Runs the full per-file pipeline. `resolver` must already contain the
/// titles of every file known so far in this batch (including this one).
pub async fn process_file(
    deps: &PipelineDeps,
    discovered: &DiscoveredFile,
    existing: Option<&File>,
    resolver: &dyn TitleResolver,
    force: bool,
) -> FileOutcome {
    let path = discovered.path.to_string_lossy().to_string();

    if let Some(existing) = existing {
        if !force && existing.checksum == discovered.checksum {
            return FileOutcome::Unchanged;
        }
        // Re-indexing a changed file: remove every prior row for it, in
        // reverse of the write order below, before writing the new version.
        if let Err(error) = delete_file_everywhere(deps, &path).await {
            return FileOutcome::Failed {
                step: "rollback-previous".into(),
                error,
            };
        }
    }

    let file = File {
        path: path.clone(),
        title: discovered.title.clone(),
        checksum: discovered.checksum.clone(),
        size: discovered.size,
        mtime: discovered.mtime,
        frontmatter: discovered.frontmatter.clone(),
        indexed_at: Some(chrono::Utc::now()),
    };

    let chunker = Chunker::new(deps.chunker_config.clone(), deps.counter.as_ref());
    let chunks = chunker.chunk(&path, &discovered.content);

    match write_new_version(deps, &file, &chunks, resolver).await {
        Ok((entity_count, edge_count)) => FileOutcome::Indexed {
            chunks: chunks.len(),
            entities: entity_count,
            edges: edge_count,
        },
        Err((step, error)) => {
            // Leave no half-written new version behind: clean up whatever
            // of the new file's rows made it into any store. We don't
            // restore the previous version's rows here; the file instead
            // ends up cleanly absent until the next successful index run.
            let _ = delete_file_everywhere(deps, &path).await;
            FileOutcome::Failed { step, error }
        }
    }
}

/// Writes one file's chunks/entities/edges across all four stores in order.
/// Returns `(entity_count, edge_count)` on success, or `(failed_step, error)`.
async fn write_new_version(
    deps: &PipelineDeps,
    file: &File,
    chunks: &[Chunk],
    resolver: &dyn TitleResolver,
) -> std::result::Result<(usize, usize), (String, DotmdError)> {
    debug!(file = %file.path, state = "discovered", "pipeline start");

    // 1. Upsert File node and Section tree into the graph store.
    deps.graph
        .upsert_file_and_sections(file, chunks)
        .await
        .map_err(|e| ("graph-sections".to_string(), e))?;
    debug!(file = %file.path, state = "chunked", chunks = chunks.len());

    // 2. Write chunks to the metadata store.
    deps.metadata
        .upsert_file(file)
        .await
        .map_err(|e| ("metadata-file".to_string(), e))?;
    deps.metadata
        .upsert_chunks(chunks)
        .await
        .map_err(|e| ("metadata-chunks".to_string(), e))?;

    // 3. Embed chunk texts in batches and write vectors keyed by chunk ID.
    let mut embedded = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(deps.embed_batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = deps
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| ("embed".to_string(), e))?;
        for (chunk, vector) in batch.iter().zip(vectors) {
            embedded.push(EmbeddedChunk {
                chunk_id: chunk.id,
                embedding: vector,
            });
        }
    }
    deps.vector
        .upsert(&file.path, &embedded)
        .await
        .map_err(|e| ("vector-write".to_string(), e))?;
    debug!(file = %file.path, state = "embedded");

    // 4. Stage chunk tokens into the sparse-index builder. The full index
    // is rebuilt once per batch by the caller, not per file.
    for chunk in chunks {
        deps.sparse
            .stage(chunk)
            .await
            .map_err(|e| ("sparse-stage".to_string(), e))?;
    }

    // Structural + optional NER extraction, then write entities/tags/edges.
    let mut entities: Vec<Entity> = Vec::new();
    // Frontmatter is a file-level attribute, not a per-chunk one: emitted
    // once here rather than through the per-chunk extractor loop below, or
    // a file with N chunks would write N duplicate edge sets.
    let mut edges: Vec<Edge> = dotmd_extract::frontmatter_edges(file);
    for chunk in chunks {
        for extractor in &deps.extractors {
            let extraction = extractor
                .extract(chunk, file, resolver)
                .await
                .map_err(|e| (format!("extract-{}", extractor.name()), e))?;
            entities.extend(extraction.entities);
            edges.extend(extraction.edges);
        }
    }
    entities.sort_by_key(|e| e.id);
    entities.dedup_by_key(|e| e.id);

    // 5. Write extracted entities, tags, and edges to the graph store.
    deps.graph
        .upsert_entities_and_edges(&file.path, &entities, &edges)
        .await
        .map_err(|e| ("graph-entities".to_string(), e))?;

    debug!(file = %file.path, state = "indexed", entities = entities.len(), edges = edges.len());
    Ok((entities.len(), edges.len()))
}

async fn delete_file_everywhere(deps: &PipelineDeps, path: &str) -> Result<()> {
    deps.graph.delete_file(path).await?;
    deps.sparse.remove_file(path).await?;
    deps.vector.delete_by_file(path).await?;
    deps.metadata.delete_chunks_for_file(path).await?;
    Ok(())
}
