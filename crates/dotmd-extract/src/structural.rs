//! Always-on extraction from Markdown syntax: wikilinks, links, tags,
//! frontmatter key-value pairs and the heading hierarchy itself.

use async_trait::async_trait;
use dotmd_core::ids::{normalise_name, SectionId, TagId};
use dotmd_core::models::{Edge, EdgeKind, Entity, Extraction, File, NodeRef, Provenance};
use dotmd_core::traits::{Extractor, TitleResolver};
use dotmd_core::{models::Chunk, Result};
use regex::Regex;
use std::sync::OnceLock;

pub struct StructuralExtractor;

impl StructuralExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StructuralExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for StructuralExtractor {
    fn name(&self) -> &'static str {
        "structural"
    }

    async fn extract(
        &self,
        chunk: &Chunk,
        _file: &File,
        corpus: &dyn TitleResolver,
    ) -> Result<Extraction> {
        let section_id = chunk.section_id();
        let mut edges = Vec::new();
        let entities = Vec::new();

        for target in wikilink_regex().captures_iter(&chunk.text) {
            let raw_target = target[1].trim();
            let (title, _heading_fragment) = match raw_target.split_once('#') {
                Some((t, h)) => (t.trim(), Some(h.trim())),
                None => (raw_target, None),
            };
            edges.push(link_edge(section_id, title, corpus));
        }

        for link in markdown_link_regex().captures_iter(&chunk.text) {
            let target = link[2].trim();
            if target.starts_with("http://") || target.starts_with("https://") {
                continue; // external links are not part of the corpus graph
            }
            edges.push(link_edge(section_id, target, corpus));
        }

        for tag in tag_regex().captures_iter(&chunk.text) {
            let raw_tag = &tag[1];
            let tag_id = TagId::new(&normalise_name(raw_tag));
            edges.push(Edge {
                kind: EdgeKind::HasTag,
                from: NodeRef::Section(section_id),
                to: NodeRef::Tag(tag_id),
                provenance: Provenance::Structural,
                properties: Default::default(),
            });
        }

        Ok(Extraction { entities, edges })
    }
}

/// `HAS_FRONTMATTER` edges for one file's key-value pairs. Runs once per
/// file (unlike `extract`, which runs once per chunk), since frontmatter is
/// a file-level attribute and emitting it per chunk would duplicate the
/// edge once for every chunk the file has.
pub fn frontmatter_edges(file: &File) -> Vec<Edge> {
    file.frontmatter
        .iter()
        .map(|(key, value)| {
            let mut properties = std::collections::HashMap::new();
            properties.insert(key.clone(), value.clone());
            Edge {
                kind: EdgeKind::HasFrontmatter,
                from: NodeRef::File(file.path.clone()),
                to: NodeRef::File(file.path.clone()),
                provenance: Provenance::Structural,
                properties,
            }
        })
        .collect()
}

fn link_edge(section_id: SectionId, target_title: &str, corpus: &dyn TitleResolver) -> Edge {
    let to = match corpus.resolve_title(target_title) {
        Some(resolved_path) => NodeRef::File(resolved_path),
        None => NodeRef::UnresolvedTitle(target_title.to_string()),
    };
    Edge {
        kind: EdgeKind::LinksTo,
        from: NodeRef::Section(section_id),
        to,
        provenance: Provenance::Structural,
        properties: Default::default(),
    }
}

/// Entities extracted from headings/frontmatter tags alone, filed under the
/// `Concept` type — used when no NER layer is enabled so the graph still
/// carries some entity-shaped nodes derived purely from document structure.
pub fn tags_as_entities(tags: &[String]) -> Vec<Entity> {
    tags.iter()
        .map(|raw| {
            let canonical = normalise_name(raw);
            Entity {
                id: dotmd_core::ids::EntityId::new(&canonical, "concept"),
                canonical_name: canonical,
                entity_type: dotmd_core::models::EntityType::Concept,
            }
        })
        .collect()
}

fn wikilink_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid wikilink regex"))
}

fn markdown_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("valid markdown link regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|\s)#([A-Za-z][\w/-]*)").expect("valid tag regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmd_core::ids::ChunkId;
    use std::collections::HashMap;

    struct StubResolver {
        known: Vec<(&'static str, &'static str)>,
    }

    impl TitleResolver for StubResolver {
        fn resolve_title(&self, title: &str) -> Option<String> {
            self.known
                .iter()
                .find(|(t, _)| t.eq_ignore_ascii_case(title))
                .map(|(_, path)| path.to_string())
        }
    }

    fn sample_chunk(text: &str) -> Chunk {
        Chunk {
            id: ChunkId::new("doc.md", 0),
            file_path: "doc.md".to_string(),
            ordinal: 0,
            heading_path: vec!["Intro".to_string()],
            text: text.to_string(),
            start_offset: 0,
            end_offset: text.len(),
            token_count: text.split_whitespace().count(),
        }
    }

    fn sample_file() -> File {
        File {
            path: "doc.md".to_string(),
            title: "Doc".to_string(),
            checksum: "abc".to_string(),
            size: 10,
            mtime: chrono::Utc::now(),
            frontmatter: HashMap::new(),
            indexed_at: None,
        }
    }

    #[tokio::test]
    async fn resolves_wikilink_to_known_file() {
        let resolver = StubResolver {
            known: vec![("Other Doc", "other.md")],
        };
        let extractor = StructuralExtractor::new();
        let chunk = sample_chunk("See [[Other Doc]] for details.");
        let extraction = extractor
            .extract(&chunk, &sample_file(), &resolver)
            .await
            .unwrap();

        let link = extraction
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::LinksTo)
            .unwrap();
        assert_eq!(link.to, NodeRef::File("other.md".to_string()));
    }

    #[tokio::test]
    async fn unresolved_wikilink_points_at_synthetic_node() {
        let resolver = StubResolver { known: vec![] };
        let extractor = StructuralExtractor::new();
        let chunk = sample_chunk("See [[Nowhere]] for details.");
        let extraction = extractor
            .extract(&chunk, &sample_file(), &resolver)
            .await
            .unwrap();

        let link = extraction
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::LinksTo)
            .unwrap();
        assert_eq!(link.to, NodeRef::UnresolvedTitle("Nowhere".to_string()));
    }

    #[tokio::test]
    async fn extracts_hashtags_as_has_tag_edges() {
        let resolver = StubResolver { known: vec![] };
        let extractor = StructuralExtractor::new();
        let chunk = sample_chunk("Filed under #rust and #async-rust.");
        let extraction = extractor
            .extract(&chunk, &sample_file(), &resolver)
            .await
            .unwrap();

        let tags: Vec<_> = extraction
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::HasTag)
            .collect();
        assert_eq!(tags.len(), 2);
    }

    #[tokio::test]
    async fn external_http_links_are_skipped() {
        let resolver = StubResolver { known: vec![] };
        let extractor = StructuralExtractor::new();
        let chunk = sample_chunk("See [docs](https://example.com) for more.");
        let extraction = extractor
            .extract(&chunk, &sample_file(), &resolver)
            .await
            .unwrap();
        assert!(extraction.edges.iter().all(|e| e.kind != EdgeKind::LinksTo));
    }

    #[test]
    fn frontmatter_edges_emits_one_edge_per_key() {
        let mut file = sample_file();
        file.frontmatter.insert("status".to_string(), "draft".to_string());
        file.frontmatter.insert("author".to_string(), "me".to_string());

        let edges = frontmatter_edges(&file);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.kind == EdgeKind::HasFrontmatter));
    }
}
