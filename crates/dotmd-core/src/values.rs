use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Retrieval mode: which engine(s) the query pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Hybrid,
    Semantic,
    Bm25,
    Graph,
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Hybrid
    }
}

impl std::str::FromStr for SearchMode {
    type Err = crate::error::DotmdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "semantic" | "dense" | "vector" => Ok(Self::Semantic),
            "bm25" | "sparse" => Ok(Self::Bm25),
            "graph" => Ok(Self::Graph),
            other => Err(crate::error::DotmdError::config(format!(
                "unknown search mode '{other}'"
            ))),
        }
    }
}

impl Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hybrid => "hybrid",
            Self::Semantic => "semantic",
            Self::Bm25 => "bm25",
            Self::Graph => "graph",
        };
        write!(f, "{s}")
    }
}

/// Per-file ingestion state machine: `IDLE -> DISCOVERED -> CHUNKED ->
/// EMBEDDED -> INDEXED`, with `Failed` as a terminal rollback state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileIndexState {
    Idle,
    Discovered,
    Chunked,
    Embedded,
    Indexed,
    Failed { step: String },
}

impl Display for FileIndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Discovered => write!(f, "discovered"),
            Self::Chunked => write!(f, "chunked"),
            Self::Embedded => write!(f, "embedded"),
            Self::Indexed => write!(f, "indexed"),
            Self::Failed { step } => write!(f, "failed({step})"),
        }
    }
}
