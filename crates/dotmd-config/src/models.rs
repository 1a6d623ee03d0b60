use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which extraction layers run during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractDepth {
    Structural,
    Ner,
}

impl Default for ExtractDepth {
    fn default() -> Self {
        Self::Structural
    }
}

/// Frozen BM25 parameters, serialised into the sparse index for reproducibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Per-edge-type traversal weights for the graph retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphWeights {
    pub mentions: f32,
    pub co_occurs: f32,
    pub links_to: f32,
    pub has_tag: f32,
    pub parent_of: f32,
}

impl Default for GraphWeights {
    fn default() -> Self {
        Self {
            mentions: 1.0,
            co_occurs: 0.8,
            links_to: 1.2,
            has_tag: 0.5,
            parent_of: 0.6,
        }
    }
}

/// Embedding model identity: frozen into `config.json` at index time and
/// checked against the query-time configuration on every search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub name: String,
    pub dimension: usize,
}

/// Process-wide application configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the on-disk layout (default `~/.dotmd`).
    pub index_dir: PathBuf,
    pub extract: ExtractConfig,
    pub models: ModelsConfig,
    pub search: SearchConfig,
    pub ingestion: IngestionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub depth: ExtractDepth,
    /// Entity type tags passed to the zero-shot NER model.
    pub entity_types: Vec<String>,
    /// Entities scoring below this floor are discarded.
    pub ner_score_floor: f32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            depth: ExtractDepth::Structural,
            entity_types: vec![
                "person".into(),
                "organization".into(),
                "technology".into(),
                "concept".into(),
                "location".into(),
            ],
            ner_score_floor: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub embedding_model_name: String,
    pub embedding_model_path: PathBuf,
    pub embedding_dimension: usize,
    pub cross_encoder_model_path: PathBuf,
    pub ner_model_path: Option<PathBuf>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            embedding_model_name: "BAAI/bge-small-en-v1.5".to_string(),
            embedding_model_path: PathBuf::from("models/bge-small-en-v1.5"),
            embedding_dimension: 384,
            cross_encoder_model_path: PathBuf::from("models/cross-encoder"),
            ner_model_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub seed_budget: usize,
    /// Every seed and every cross-file edge target is a structural
    /// has_section/has_chunk hop away from the chunk nodes either side of it,
    /// so reaching one linked/co-occurring chunk away from a seed costs four
    /// BFS hops, not one. Four is the shallowest value that crosses a single
    /// file boundary; raise it to follow multi-file chains.
    pub graph_hops: u8,
    pub rrf_k: f32,
    pub rerank_score_floor: f32,
    pub bm25: Bm25Params,
    pub graph_weights: GraphWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            seed_budget: 20,
            graph_hops: 4,
            rrf_k: 60.0,
            rerank_score_floor: -8.0,
            bm25: Bm25Params::default(),
            graph_weights: GraphWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub worker_pool_size: usize,
    pub max_chunk_tokens: usize,
    pub chunk_overlap_tokens: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: num_cpus::get(),
            max_chunk_tokens: 512,
            chunk_overlap_tokens: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            extract: ExtractConfig::default(),
            models: ModelsConfig::default(),
            search: SearchConfig::default(),
            ingestion: IngestionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn vectors_db_path(&self) -> PathBuf {
        self.index_dir.join("vectors.db")
    }

    pub fn graph_db_path(&self) -> PathBuf {
        self.index_dir.join("graph.db")
    }

    pub fn metadata_db_path(&self) -> PathBuf {
        self.index_dir.join("metadata.db")
    }

    pub fn bm25_index_path(&self) -> PathBuf {
        self.index_dir.join("bm25_index.bin")
    }

    pub fn frozen_config_path(&self) -> PathBuf {
        self.index_dir.join("config.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.index_dir.join(".dotmd.lock")
    }

    pub fn acronyms_path(&self) -> PathBuf {
        self.index_dir.join("acronyms.toml")
    }

    pub fn model_identity(&self) -> ModelIdentity {
        ModelIdentity {
            name: self.models.embedding_model_name.clone(),
            dimension: self.models.embedding_dimension,
        }
    }
}

fn default_index_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join(".dotmd")
}
