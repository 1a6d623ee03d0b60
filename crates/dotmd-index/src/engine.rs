//! The public surface of the dotmd engine: `index`, `search`, `status` and
//! `clear`. Wires the config-resolved stores together behind the advisory
//! index lock, assembles the extraction layers from `ExtractConfig`, and
//! enforces the frozen-model-identity check on every query.

use crate::options::IndexOptions;
use crate::pipeline::{self, FileOutcome, PipelineDeps};
use crate::title_resolver::SnapshotTitleResolver;
use dotmd_config::{AppConfig, ExtractDepth, FrozenConfig};
use dotmd_core::models::{IndexStatus, IndexSummary};
use dotmd_core::traits::{Extractor, GraphStore, MetadataStore, SparseIndex, VectorStore};
use dotmd_core::{DotmdError, Result};
use dotmd_document::tokens::TokenCounter;
use dotmd_document::{ChunkerConfig, Reader};
use dotmd_extract::{NerBackend, NerExtractor, StructuralExtractor};
use dotmd_models::{CrossEncoder, Embedder};
use dotmd_search::{
    AcronymDictionary, DenseRetriever, GraphRetriever, HeadingIndex, QueryExpander, Reranker,
    SearchOptions, SearchPipeline, SearchResult, SparseRetriever,
};
use dotmd_storage::{Bm25SparseIndex, IndexLock, SqliteGraphStore, SqliteMetadataStore, SqliteVectorStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Chunks are embedded in batches of this size; large enough to amortise a
/// single ONNX session call, small enough that one slow batch doesn't stall
/// the whole file.
const EMBED_BATCH_SIZE: usize = 32;

/// The model handles the core takes no opinion on constructing — loading an
/// ONNX session is expensive and belongs to whoever owns the process-wide
/// singleton, so the caller builds these once and hands them to `Engine::open`.
pub struct ModelHandles {
    pub embedder: Arc<dyn Embedder>,
    /// Tokenises exactly the way `embedder` does (see `OnnxEmbedder::token_counter`).
    pub counter: Arc<dyn TokenCounter>,
    pub cross_encoder: Option<Arc<dyn CrossEncoder>>,
    /// Present only when `ExtractConfig::depth` is `Ner`; a `Structural`-only
    /// configuration never needs one.
    pub ner_backend: Option<Box<dyn NerBackend>>,
}

pub struct Engine {
    config: AppConfig,
    _lock: IndexLock,
    metadata: Arc<dyn MetadataStore>,
    vector: Arc<dyn VectorStore>,
    sparse: Arc<dyn SparseIndex>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    counter: Arc<dyn TokenCounter>,
    cross_encoder: Option<Arc<dyn CrossEncoder>>,
    extractors: Vec<Arc<dyn Extractor>>,
}

impl Engine {
    /// Opens (or creates) the on-disk index under `config.index_dir`,
    /// acquiring the exclusive advisory lock for the returned value's
    /// lifetime. Fails immediately if another process already holds it.
    pub fn open(config: AppConfig, models: ModelHandles) -> Result<Self> {
        let lock = IndexLock::acquire(&config.lock_path())?;
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(SqliteMetadataStore::open(&config.metadata_db_path())?);
        let vector: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::open(&config.vectors_db_path())?);
        let sparse: Arc<dyn SparseIndex> =
            Arc::new(Bm25SparseIndex::open(&config.bm25_index_path(), config.search.bm25)?);
        let graph: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::open(&config.graph_db_path())?);
        Self::build(config, lock, metadata, vector, sparse, graph, models)
    }

    /// In-memory variant for tests: same extractor/model wiring, no real
    /// store files, but still a real advisory lock (tests point `index_dir`
    /// at a tempdir, matching the on-disk layout's lock semantics).
    pub fn open_in_memory(config: AppConfig, models: ModelHandles) -> Result<Self> {
        let lock = IndexLock::acquire(&config.lock_path())?;
        let metadata: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::open_in_memory()?);
        let vector: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::open_in_memory()?);
        let sparse: Arc<dyn SparseIndex> = Arc::new(Bm25SparseIndex::in_memory(config.search.bm25));
        let graph: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::open_in_memory()?);
        Self::build(config, lock, metadata, vector, sparse, graph, models)
    }

    fn build(
        config: AppConfig,
        lock: IndexLock,
        metadata: Arc<dyn MetadataStore>,
        vector: Arc<dyn VectorStore>,
        sparse: Arc<dyn SparseIndex>,
        graph: Arc<dyn GraphStore>,
        models: ModelHandles,
    ) -> Result<Self> {
        let mut extractors: Vec<Arc<dyn Extractor>> = vec![Arc::new(StructuralExtractor::new())];
        if config.extract.depth == ExtractDepth::Ner {
            let backend = models.ner_backend.ok_or_else(|| {
                DotmdError::config("extract.depth is \"ner\" but no NER backend was supplied")
            })?;
            extractors.push(Arc::new(NerExtractor::new(
                backend,
                config.extract.entity_types.clone(),
                config.extract.ner_score_floor,
            )));
        }

        Ok(Self {
            config,
            _lock: lock,
            metadata,
            vector,
            sparse,
            graph,
            embedder: models.embedder,
            counter: models.counter,
            cross_encoder: models.cross_encoder,
            extractors,
        })
    }

    /// Walks `root`, chunks/extracts/embeds every new or changed file, and
    /// writes the four coordinated indices plus the frozen model snapshot.
    /// A worker pool bounded by `config.ingestion.worker_pool_size` processes
    /// files concurrently; a set `deadline` stops *new* files being started
    /// once it passes (work already in flight is allowed to finish, since
    /// each file's own pipeline run is the unit of atomicity, not the batch).
    pub async fn index(&self, root: &Path, options: IndexOptions) -> Result<IndexSummary> {
        let reader = Reader::new(root)?;
        let paths = reader.discover(root)?;

        let mut resolver = SnapshotTitleResolver::new();
        for (path, title) in self.metadata.list_titles().await? {
            resolver.insert(&title, &path);
        }

        let mut discovered = Vec::with_capacity(paths.len());
        for path in &paths {
            let file = reader.read(path)?;
            resolver.insert(&file.title, &file.path.to_string_lossy());
            discovered.push(file);
        }
        let resolver = Arc::new(resolver);

        let chunker_config = ChunkerConfig {
            max_tokens: self.config.ingestion.max_chunk_tokens,
            overlap_tokens: self.config.ingestion.chunk_overlap_tokens,
        };
        let deps = PipelineDeps {
            metadata: self.metadata.clone(),
            vector: self.vector.clone(),
            sparse: self.sparse.clone(),
            graph: self.graph.clone(),
            embedder: self.embedder.clone(),
            counter: self.counter.clone(),
            extractors: self.extractors.clone(),
            chunker_config,
            embed_batch_size: EMBED_BATCH_SIZE,
        };

        let semaphore = Arc::new(Semaphore::new(self.config.ingestion.worker_pool_size.max(1)));
        let deadline = options.deadline.map(|d| Instant::now() + d);

        let mut tasks = Vec::with_capacity(discovered.len());
        let mut deadline_hit = false;
        for file in discovered {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    deadline_hit = true;
                    break;
                }
            }
            let path_str = file.path.to_string_lossy().to_string();
            let existing = self.metadata.get_file(&path_str).await?;
            let deps = deps.clone();
            let resolver = resolver.clone();
            let semaphore = semaphore.clone();
            let force = options.force;
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker pool semaphore is never closed");
                let outcome = pipeline::process_file(&deps, &file, existing.as_ref(), resolver.as_ref(), force).await;
                (path_str, outcome)
            }));
        }

        let mut summary = IndexSummary::default();
        for task in tasks {
            match task.await {
                Ok((path, outcome)) => match outcome {
                    FileOutcome::Unchanged => {}
                    FileOutcome::Indexed { chunks, entities, edges } => {
                        summary.files_indexed += 1;
                        summary.chunks += chunks;
                        summary.entities += entities;
                        summary.edges += edges;
                    }
                    FileOutcome::Failed { step, error } => {
                        warn!(file = %path, step = %step, %error, "file failed to index");
                        summary.files_failed += 1;
                        summary.errors.push(format!("{path}: {step}: {error}"));
                    }
                },
                Err(join_error) => {
                    summary.files_failed += 1;
                    summary.errors.push(format!("indexing task panicked: {join_error}"));
                }
            }
        }
        if deadline_hit {
            summary
                .errors
                .push("deadline reached before every discovered file could be started".to_string());
        }

        self.sparse.rebuild().await?;
        FrozenConfig::from_app_config(&self.config).write(&self.config.frozen_config_path())?;

        info!(
            files_indexed = summary.files_indexed,
            files_failed = summary.files_failed,
            "index run complete"
        );
        Ok(summary)
    }

    /// Runs the query pipeline. Fails fast with `ModelMismatch` if the
    /// configured embedding model differs from the one the index was frozen
    /// with, before any retriever touches the stores.
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResult>> {
        let frozen = FrozenConfig::read(&self.config.frozen_config_path())?
            .ok_or_else(|| DotmdError::index_missing(self.config.index_dir.display().to_string()))?;
        frozen.check_model_match(&self.config.model_identity())?;

        let acronyms = AcronymDictionary::load(&self.config.acronyms_path());
        let headings = HeadingIndex::from_heading_paths(self.metadata.list_heading_paths().await?);
        let expander = QueryExpander::new(acronyms, headings);

        let dense = DenseRetriever::new(self.embedder.clone(), self.vector.clone());
        let sparse = SparseRetriever::new(self.sparse.clone());
        let graph = GraphRetriever::new(self.graph.clone(), self.config.search.graph_hops);
        let reranker = self
            .cross_encoder
            .clone()
            .map(|ce| Reranker::new(ce, self.config.search.rerank_score_floor));

        let pipeline = SearchPipeline::new(
            self.metadata.clone(),
            dense,
            sparse,
            graph,
            expander,
            reranker,
            self.config.search.seed_budget,
            self.config.search.rrf_k,
        );
        pipeline.search(query, options).await
    }

    /// A point-in-time health/summary snapshot.
    pub async fn status(&self) -> Result<IndexStatus> {
        let (files, chunks) = self.metadata.counts().await?;
        let (entities, edges) = self.graph.counts().await?;
        let last_indexed = std::fs::metadata(self.config.frozen_config_path())
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .and_then(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0));
        Ok(IndexStatus {
            files,
            chunks,
            entities,
            edges,
            last_indexed,
        })
    }

    /// Empties every store and removes the frozen config snapshot, so the
    /// next `index()` starts from a clean slate.
    pub async fn clear(&self) -> Result<()> {
        self.metadata.clear().await?;
        self.vector.clear().await?;
        self.sparse.clear().await?;
        self.graph.clear().await?;
        let _ = std::fs::remove_file(self.config.frozen_config_path());
        Ok(())
    }

    /// Explicit maintenance operation, never run from `index()`'s hot path.
    pub async fn gc(&self) -> Result<usize> {
        crate::maintenance::gc_orphan_entities(self.graph.as_ref()).await
    }
}
