//! Deterministic, content-derived identifiers.
//!
//! Every stable ID in the system (chunk, section, entity, tag) is a hash of
//! some canonical string, never a random UUID: re-indexing an unchanged file
//! must reproduce byte-identical IDs across all four stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

/// A stable 128-bit content hash rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StableId(u128);

impl StableId {
    pub fn from_parts(parts: &[&str]) -> Self {
        let joined = parts.join(":");
        Self(xxh3_128(joined.as_bytes()))
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl std::str::FromStr for StableId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u128::from_str_radix(s, 16).map(Self)
    }
}

/// Identifier of a chunk: `hash(file_path + ":" + ordinal)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub StableId);

impl ChunkId {
    pub fn new(file_path: &str, ordinal: usize) -> Self {
        Self(StableId::from_parts(&[file_path, &ordinal.to_string()]))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChunkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Identifier of a section: `hash(file_path + heading_path)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionId(pub StableId);

impl SectionId {
    pub fn new(file_path: &str, heading_path: &[String]) -> Self {
        let mut parts: Vec<&str> = vec![file_path];
        parts.extend(heading_path.iter().map(|s| s.as_str()));
        Self(StableId::from_parts(&parts))
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SectionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Identifier of an entity: `hash(normalised_name + type)`, global across
/// the corpus so the same entity shares one ID everywhere it is mentioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub StableId);

impl EntityId {
    pub fn new(canonical_name: &str, type_tag: &str) -> Self {
        Self(StableId::from_parts(&[canonical_name, type_tag]))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Identifier of a tag: `hash(normalised_tag_string)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(pub StableId);

impl TagId {
    pub fn new(normalised: &str) -> Self {
        Self(StableId::from_parts(&[normalised]))
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Canonicalise an entity/tag name: case-folded, whitespace-collapsed.
pub fn normalise_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable() {
        let a = ChunkId::new("foo.md", 0);
        let b = ChunkId::new("foo.md", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_id_differs_by_ordinal() {
        let a = ChunkId::new("foo.md", 0);
        let b = ChunkId::new("foo.md", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn normalise_name_collapses_whitespace_and_case() {
        assert_eq!(normalise_name("  Alice   Smith "), "alice smith");
    }

    #[test]
    fn entity_id_stable_under_normalisation() {
        let a = EntityId::new(&normalise_name("Alice"), "person");
        let b = EntityId::new(&normalise_name("  alice "), "person");
        assert_eq!(a, b);
    }
}
