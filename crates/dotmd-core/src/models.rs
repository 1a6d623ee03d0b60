//! The shared data model: files, chunks, sections, entities, tags and the
//! property-graph edges between them.

use crate::ids::{ChunkId, EntityId, SectionId, TagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A discovered Markdown source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// Absolute path; the primary identity of a file.
    pub path: String,
    pub title: String,
    /// Hex-encoded xxh3-128 content hash.
    pub checksum: String,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub frontmatter: HashMap<String, String>,
    pub indexed_at: Option<DateTime<Utc>>,
}

/// The unit of retrieval: a heading-scoped, token-bounded passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub file_path: String,
    pub ordinal: usize,
    pub heading_path: Vec<String>,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub token_count: usize,
}

impl Chunk {
    /// The section this chunk belongs to (its immediate heading scope).
    pub fn section_id(&self) -> SectionId {
        SectionId::new(&self.file_path, &self.heading_path)
    }
}

/// A heading node in a file's heading tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub file_path: String,
    pub level: u8,
    pub heading_text: String,
    pub heading_path: Vec<String>,
    pub parent: Option<SectionId>,
}

/// A closed set of entity type tags, configurable at index time via
/// `ExtractConfig::entity_types`, but represented as a Rust enum rather than
/// an open string set once configuration has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    Organization,
    Technology,
    Concept,
    Location,
    Custom(String),
}

impl EntityType {
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Technology => "technology",
            Self::Concept => "concept",
            Self::Location => "location",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "person" => Self::Person,
            "organization" | "org" => Self::Organization,
            "technology" | "tech" => Self::Technology,
            "concept" => Self::Concept,
            "location" => Self::Location,
            other => Self::Custom(other.to_string()),
        })
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// A named thing extracted from a chunk, shared by ID across the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub canonical_name: String,
    pub entity_type: EntityType,
}

/// A hashtag or frontmatter tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub raw: String,
}

/// The source or target of an edge: either a section or a whole file (used
/// by LINKS_TO when a wikilink resolves to a file rather than a specific
/// heading, and by HAS_TAG/HAS_FRONTMATTER which can hang off either).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRef {
    File(String),
    Section(SectionId),
    Entity(EntityId),
    Tag(TagId),
    /// A wikilink/markdown-link target that did not resolve to a known file
    /// title; recorded so the edge still exists, pointed at a synthetic node.
    UnresolvedTitle(String),
}

/// Provenance of an edge: which pipeline stage produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Structural,
    Ner,
}

/// One row of the property graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub from: NodeRef,
    pub to: NodeRef,
    pub provenance: Provenance,
    /// For HAS_FRONTMATTER edges, the (key, value) pair; empty otherwise.
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    HasSection,
    ParentOf,
    LinksTo,
    HasTag,
    Mentions,
    CoOccurs,
    HasFrontmatter,
}

impl EdgeKind {
    /// Per-edge-type traversal weight used by the graph retriever, frozen in
    /// `config.json` at index build time (see GraphConfig).
    pub fn default_weight(&self) -> f32 {
        match self {
            Self::Mentions => 1.0,
            Self::CoOccurs => 0.8,
            Self::LinksTo => 1.2,
            Self::HasTag => 0.5,
            Self::ParentOf => 0.6,
            Self::HasSection | Self::HasFrontmatter => 0.3,
        }
    }
}

/// Result of extracting entities/relations from a single chunk.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
}

/// Health/summary snapshot returned by `status()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub files: usize,
    pub chunks: usize,
    pub entities: usize,
    pub edges: usize,
    pub last_indexed: Option<DateTime<Utc>>,
}

/// Summary returned by `index()`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexSummary {
    pub files_indexed: usize,
    pub files_failed: usize,
    pub chunks: usize,
    pub entities: usize,
    pub edges: usize,
    pub errors: Vec<String>,
}
