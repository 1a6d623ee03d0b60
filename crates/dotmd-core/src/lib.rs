//! Core domain model, errors and storage/retrieval traits shared across the
//! dotmd engine.
//!
//! This crate has no I/O of its own: it defines what a file, chunk, section,
//! entity and edge *are*, what can go wrong, and the trait boundary that the
//! ingestion and query pipelines dispatch through.
pub mod error;
pub mod ids;
pub mod models;
pub mod tokenize;
pub mod traits;
pub mod values;

pub use error::{DotmdError, Result};
pub use ids::{ChunkId, EntityId, SectionId, StableId, TagId};
pub use tokenize::tokenize_terms;
pub use values::{FileIndexState, SearchMode};

pub use chrono::{DateTime, Utc};
