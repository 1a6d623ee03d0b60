//! Query expansion, the three retrievers, RRF fusion and cross-encoder
//! reranking — the query-side half of the dotmd engine.

pub mod expand;
pub mod fusion;
pub mod models;
pub mod pipeline;
pub mod rerank;
pub mod retrievers;

pub use expand::{AcronymDictionary, HeadingIndex, QueryExpander};
pub use models::{SearchOptions, SearchResult};
pub use pipeline::SearchPipeline;
pub use rerank::Reranker;
pub use retrievers::{DenseRetriever, GraphRetriever, SparseRetriever};
