//! Orchestrates the ingestion pipeline: discovery, chunking, extraction and
//! the ordered writes into the four coordinated indices (metadata, vector,
//! sparse, graph). Also hosts the `Engine` that exposes the core's public
//! surface (`index`, `search`, `status`, `clear`) over whichever concrete
//! stores and models the caller wires up.

pub mod engine;
pub mod maintenance;
pub mod options;
pub mod pipeline;
pub mod title_resolver;

pub use engine::{Engine, ModelHandles};
pub use options::IndexOptions;
