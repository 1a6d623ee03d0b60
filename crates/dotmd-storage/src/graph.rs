//! The property graph store. Nodes and edges are kept as flat, ID-keyed
//! tables (never in-memory cycles between domain records — see the design
//! note on cyclic references); traversal loads the edge table into an
//! adjacency list and walks it with a bounded BFS.

use async_trait::async_trait;
use dotmd_core::ids::{ChunkId, EntityId, SectionId};
use dotmd_core::models::{Chunk, Edge, EdgeKind, Entity, File, NodeRef};
use dotmd_core::traits::GraphStore;
use dotmd_core::{DotmdError, Result};
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;

pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            label TEXT NOT NULL,
            owner_file TEXT
        );
        CREATE TABLE IF NOT EXISTS edges (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            weight REAL NOT NULL,
            owner_file TEXT
        );
        CREATE INDEX IF NOT EXISTS edges_owner_idx ON edges(owner_file);
        CREATE INDEX IF NOT EXISTS edges_from_idx ON edges(from_id);
        CREATE INDEX IF NOT EXISTS nodes_owner_idx ON nodes(owner_file);",
    )
    .map_err(|e| DotmdError::index_write("graph", e.to_string()))
}

/// Node-space ID encoding. A section's ancestor chain and a chunk's
/// belonging-section are represented as ordinary nodes/edges so traversal
/// never special-cases them.
fn file_node(path: &str) -> String {
    format!("file:{path}")
}
fn section_node(id: SectionId) -> String {
    format!("section:{id}")
}
fn entity_node(id: EntityId) -> String {
    format!("entity:{id}")
}
fn tag_node(id: dotmd_core::ids::TagId) -> String {
    format!("tag:{id}")
}
fn chunk_node(id: ChunkId) -> String {
    format!("chunk:{id}")
}
fn unresolved_node(title: &str) -> String {
    format!("unresolved:{title}")
}

fn node_ref_id(node: &NodeRef) -> String {
    match node {
        NodeRef::File(path) => file_node(path),
        NodeRef::Section(id) => section_node(*id),
        NodeRef::Entity(id) => entity_node(*id),
        NodeRef::Tag(id) => tag_node(*id),
        NodeRef::UnresolvedTitle(title) => unresolved_node(title),
    }
}

fn edge_kind_label(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::HasSection => "has_section",
        EdgeKind::ParentOf => "parent_of",
        EdgeKind::LinksTo => "links_to",
        EdgeKind::HasTag => "has_tag",
        EdgeKind::Mentions => "mentions",
        EdgeKind::CoOccurs => "co_occurs",
        EdgeKind::HasFrontmatter => "has_frontmatter",
    }
}

const HAS_CHUNK_KIND: &str = "has_chunk";
const HAS_CHUNK_WEIGHT: f32 = 1.0;

/// Every ancestor heading-path prefix of `path`, shortest first; an empty
/// `path` yields a single root prefix (the file-level implicit section).
fn heading_prefixes(path: &[String]) -> Vec<Vec<String>> {
    if path.is_empty() {
        return vec![Vec::new()];
    }
    (1..=path.len()).map(|n| path[..n].to_vec()).collect()
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn upsert_file_and_sections(&self, file: &File, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;

        let file_id = file_node(&file.path);
        tx.execute(
            "INSERT INTO nodes (id, kind, label, owner_file) VALUES (?1, 'file', ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET label = excluded.label",
            params![file_id, file.title, file.path],
        )
        .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;

        let mut seen_sections: HashSet<SectionId> = HashSet::new();
        for chunk in chunks {
            let prefixes = heading_prefixes(&chunk.heading_path);
            let mut parent_id: Option<SectionId> = None;
            for prefix in &prefixes {
                let section_id = SectionId::new(&chunk.file_path, prefix);
                if seen_sections.insert(section_id) {
                    let label = prefix.last().cloned().unwrap_or_else(|| file.title.clone());
                    let node_id = section_node(section_id);
                    tx.execute(
                        "INSERT INTO nodes (id, kind, label, owner_file) VALUES (?1, 'section', ?2, ?3)
                         ON CONFLICT(id) DO UPDATE SET label = excluded.label",
                        params![node_id, label, file.path],
                    )
                    .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;

                    tx.execute(
                        "INSERT INTO edges (kind, from_id, to_id, weight, owner_file) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            edge_kind_label(EdgeKind::HasSection),
                            file_id,
                            section_node(section_id),
                            EdgeKind::HasSection.default_weight(),
                            file.path,
                        ],
                    )
                    .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;

                    if let Some(parent) = parent_id {
                        tx.execute(
                            "INSERT INTO edges (kind, from_id, to_id, weight, owner_file) VALUES (?1, ?2, ?3, ?4, ?5)",
                            params![
                                edge_kind_label(EdgeKind::ParentOf),
                                section_node(parent),
                                section_node(section_id),
                                EdgeKind::ParentOf.default_weight(),
                                file.path,
                            ],
                        )
                        .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
                    }
                }
                parent_id = Some(section_id);
            }

            let leaf_section = chunk.section_id();
            let chunk_node_id = chunk_node(chunk.id);
            tx.execute(
                "INSERT INTO nodes (id, kind, label, owner_file) VALUES (?1, 'chunk', ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET label = excluded.label",
                params![chunk_node_id, chunk.ordinal.to_string(), file.path],
            )
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
            tx.execute(
                "INSERT INTO edges (kind, from_id, to_id, weight, owner_file) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    HAS_CHUNK_KIND,
                    section_node(leaf_section),
                    chunk_node_id,
                    HAS_CHUNK_WEIGHT,
                    file.path,
                ],
            )
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        Ok(())
    }

    async fn upsert_entities_and_edges(
        &self,
        file_path: &str,
        entities: &[Entity],
        edges: &[Edge],
    ) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;

        for entity in entities {
            tx.execute(
                "INSERT INTO nodes (id, kind, label, owner_file) VALUES (?1, 'entity', ?2, NULL)
                 ON CONFLICT(id) DO UPDATE SET label = excluded.label",
                params![entity_node(entity.id), entity.canonical_name],
            )
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        }

        for edge in edges {
            if let NodeRef::Tag(id) = &edge.to {
                tx.execute(
                    "INSERT INTO nodes (id, kind, label, owner_file) VALUES (?1, 'tag', ?2, NULL)
                     ON CONFLICT(id) DO NOTHING",
                    params![tag_node(*id), id.to_string()],
                )
                .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
            }
            if let NodeRef::UnresolvedTitle(title) = &edge.to {
                tx.execute(
                    "INSERT INTO nodes (id, kind, label, owner_file) VALUES (?1, 'unresolved', ?2, NULL)
                     ON CONFLICT(id) DO NOTHING",
                    params![unresolved_node(title), title],
                )
                .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
            }

            tx.execute(
                "INSERT INTO edges (kind, from_id, to_id, weight, owner_file) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    edge_kind_label(edge.kind),
                    node_ref_id(&edge.from),
                    node_ref_id(&edge.to),
                    edge.kind.default_weight(),
                    file_path,
                ],
            )
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM edges WHERE owner_file = ?1", params![path])
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        conn.execute("DELETE FROM nodes WHERE owner_file = ?1", params![path])
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        Ok(())
    }

    async fn traverse(&self, seeds: &[ChunkId], max_hops: u8) -> Result<Vec<(ChunkId, f32)>> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().await;

        let mut stmt = conn
            .prepare("SELECT from_id, to_id, weight FROM edges")
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let from: String = row.get(0)?;
                let to: String = row.get(1)?;
                let weight: f64 = row.get(2)?;
                Ok((from, to, weight as f32))
            })
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;

        let mut adjacency: HashMap<String, Vec<(String, f32)>> = HashMap::new();
        for row in rows {
            let (from, to, weight) = row.map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
            adjacency.entry(from.clone()).or_default().push((to.clone(), weight));
            adjacency.entry(to).or_default().push((from, weight));
        }

        let mut scores: HashMap<String, f32> = HashMap::new();
        let mut visited_at_hop: HashMap<String, u8> = HashMap::new();
        let mut queue: VecDeque<(String, u8)> = VecDeque::new();

        for seed in seeds {
            let id = chunk_node(*seed);
            if visited_at_hop.insert(id.clone(), 0).is_none() {
                queue.push_back((id, 0));
            }
        }

        while let Some((node, hop)) = queue.pop_front() {
            if hop >= max_hops {
                continue;
            }
            let Some(neighbors) = adjacency.get(&node) else {
                continue;
            };
            let next_hop = hop + 1;
            for (neighbor, weight) in neighbors {
                let contribution = weight / (next_hop as f32).powi(2);
                *scores.entry(neighbor.clone()).or_insert(0.0) += contribution;

                let should_enqueue = match visited_at_hop.get(neighbor) {
                    Some(&existing_hop) => next_hop < existing_hop,
                    None => true,
                };
                if should_enqueue {
                    visited_at_hop.insert(neighbor.clone(), next_hop);
                    queue.push_back((neighbor.clone(), next_hop));
                }
            }
        }

        let seed_ids: HashSet<String> = seeds.iter().map(|id| chunk_node(*id)).collect();
        let mut results: Vec<(ChunkId, f32)> = scores
            .into_iter()
            .filter_map(|(node_id, score)| {
                if seed_ids.contains(&node_id) {
                    return None;
                }
                let raw = node_id.strip_prefix("chunk:")?;
                ChunkId::from_str(raw).ok().map(|id| (id, score))
            })
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(results)
    }

    async fn counts(&self) -> Result<(usize, usize)> {
        let conn = self.conn.lock().await;
        let entities: i64 = conn
            .query_row("SELECT COUNT(*) FROM nodes WHERE kind = 'entity'", [], |r| r.get(0))
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        let edges: i64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        Ok((entities as usize, edges as usize))
    }

    async fn delete_orphan_entities(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute(
                "DELETE FROM nodes WHERE kind = 'entity' AND id NOT IN (
                    SELECT from_id FROM edges UNION SELECT to_id FROM edges
                 )",
                [],
            )
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        Ok(deleted)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("DELETE FROM edges; DELETE FROM nodes;")
            .map_err(|e| DotmdError::index_write("graph", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmd_core::ids::ChunkId as Id;
    use dotmd_core::models::{EntityType, Provenance};
    use std::collections::HashMap as Map;

    fn sample_file(path: &str, title: &str) -> File {
        File {
            path: path.to_string(),
            title: title.to_string(),
            checksum: "x".to_string(),
            size: 1,
            mtime: chrono::Utc::now(),
            frontmatter: Map::new(),
            indexed_at: None,
        }
    }

    fn sample_chunk(path: &str, ordinal: usize, heading_path: Vec<String>) -> Chunk {
        Chunk {
            id: Id::new(path, ordinal),
            file_path: path.to_string(),
            ordinal,
            heading_path,
            text: "text".to_string(),
            start_offset: 0,
            end_offset: 4,
            token_count: 1,
        }
    }

    #[tokio::test]
    async fn traverse_follows_links_to_between_files() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let file_a = sample_file("a.md", "A");
        let chunk_a = sample_chunk("a.md", 0, vec!["Intro".to_string()]);
        store.upsert_file_and_sections(&file_a, &[chunk_a.clone()]).await.unwrap();

        let file_b = sample_file("b.md", "B");
        let chunk_b = sample_chunk("b.md", 0, vec!["Intro".to_string()]);
        store.upsert_file_and_sections(&file_b, &[chunk_b.clone()]).await.unwrap();

        let edge = Edge {
            kind: EdgeKind::LinksTo,
            from: NodeRef::Section(chunk_a.section_id()),
            to: NodeRef::File("b.md".to_string()),
            provenance: Provenance::Structural,
            properties: Map::new(),
        };
        store.upsert_entities_and_edges("a.md", &[], &[edge]).await.unwrap();

        // chunk_a -> its section -> (links_to) file_b -> file_b's section -> chunk_b:
        // four structural hops, since crossing into another file and back down to one
        // of its chunks always pays the has_section/has_chunk wrapper cost on both ends.
        let results = store.traverse(&[chunk_a.id], 4).await.unwrap();
        assert!(results.iter().any(|(id, _)| *id == chunk_b.id));
    }

    #[tokio::test]
    async fn delete_file_removes_its_edges_but_keeps_global_entities() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let file_a = sample_file("a.md", "A");
        let chunk_a = sample_chunk("a.md", 0, vec![]);
        store.upsert_file_and_sections(&file_a, &[chunk_a.clone()]).await.unwrap();

        let entity = Entity {
            id: EntityId::new("alice", "person"),
            canonical_name: "alice".to_string(),
            entity_type: EntityType::Person,
        };
        let edge = Edge {
            kind: EdgeKind::Mentions,
            from: NodeRef::Section(chunk_a.section_id()),
            to: NodeRef::Entity(entity.id),
            provenance: Provenance::Ner,
            properties: Map::new(),
        };
        store
            .upsert_entities_and_edges("a.md", &[entity.clone()], &[edge])
            .await
            .unwrap();

        store.delete_file("a.md").await.unwrap();

        let (entities, edges) = store.counts().await.unwrap();
        assert_eq!(entities, 1, "entity should survive file deletion");
        assert_eq!(edges, 0, "edges owned by the file should be gone");
    }

    #[tokio::test]
    async fn no_seeds_returns_empty() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let results = store.traverse(&[], 2).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_orphan_entities_removes_only_zero_degree_entities() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let file_a = sample_file("a.md", "A");
        let chunk_a = sample_chunk("a.md", 0, vec![]);
        store.upsert_file_and_sections(&file_a, &[chunk_a.clone()]).await.unwrap();

        let linked = Entity {
            id: EntityId::new("alice", "person"),
            canonical_name: "alice".to_string(),
            entity_type: EntityType::Person,
        };
        let orphan = Entity {
            id: EntityId::new("bob", "person"),
            canonical_name: "bob".to_string(),
            entity_type: EntityType::Person,
        };
        let edge = Edge {
            kind: EdgeKind::Mentions,
            from: NodeRef::Section(chunk_a.section_id()),
            to: NodeRef::Entity(linked.id),
            provenance: Provenance::Ner,
            properties: Map::new(),
        };
        store
            .upsert_entities_and_edges("a.md", &[linked.clone(), orphan.clone()], &[edge])
            .await
            .unwrap();

        let removed = store.delete_orphan_entities().await.unwrap();
        assert_eq!(removed, 1);
        let (entities, _) = store.counts().await.unwrap();
        assert_eq!(entities, 1, "only the linked entity should remain");
    }
}
