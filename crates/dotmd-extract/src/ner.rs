//! Optional NER extraction layer. The backend is pluggable: anything that
//! can score `(text, type_list) -> Vec<(surface_form, type, start, end, score)>`
//! can drive this extractor. The actual ONNX-backed backend lives in
//! `dotmd-models`; a disabled/null backend lives here so the pipeline can run
//! with `ExtractDepth::Structural` without linking a model loader at all.

use async_trait::async_trait;
use dotmd_core::ids::{normalise_name, EntityId};
use dotmd_core::models::{Edge, EdgeKind, Entity, EntityType, Extraction, File, NodeRef, Provenance};
use dotmd_core::traits::{Extractor, TitleResolver};
use dotmd_core::{models::Chunk, Result};
use std::collections::HashMap;
use std::str::FromStr;

/// One entity mention as returned by a NER backend.
#[derive(Debug, Clone)]
pub struct Mention {
    pub surface_form: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

/// A zero-shot NER backend: input is chunk text plus the configured type
/// set, output is a list of scored mentions.
#[async_trait]
pub trait NerBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn recognize(&self, text: &str, entity_types: &[String]) -> Result<Vec<Mention>>;
}

/// Backend that never finds anything. Used when extraction depth is
/// `Structural` but the pipeline still wants a single `Extractor` seam.
pub struct DisabledNerBackend;

#[async_trait]
impl NerBackend for DisabledNerBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn recognize(&self, _text: &str, _entity_types: &[String]) -> Result<Vec<Mention>> {
        Ok(Vec::new())
    }
}

pub struct NerExtractor {
    backend: Box<dyn NerBackend>,
    entity_types: Vec<String>,
    score_floor: f32,
}

impl NerExtractor {
    pub fn new(backend: Box<dyn NerBackend>, entity_types: Vec<String>, score_floor: f32) -> Self {
        Self {
            backend,
            entity_types,
            score_floor,
        }
    }
}

#[async_trait]
impl Extractor for NerExtractor {
    fn name(&self) -> &'static str {
        "ner"
    }

    async fn extract(
        &self,
        chunk: &Chunk,
        _file: &File,
        _corpus: &dyn TitleResolver,
    ) -> Result<Extraction> {
        let mentions = self.backend.recognize(&chunk.text, &self.entity_types).await?;
        let section_id = chunk.section_id();

        let mut entities = Vec::new();
        let mut edges = Vec::new();
        let mut seen_in_chunk: HashMap<EntityId, Entity> = HashMap::new();

        for mention in mentions {
            if mention.score < self.score_floor {
                continue;
            }
            let canonical = normalise_name(&mention.surface_form);
            let entity_type =
                EntityType::from_str(&mention.entity_type).unwrap_or(EntityType::Concept);
            let entity = Entity {
                id: EntityId::new(&canonical, entity_type.as_tag()),
                canonical_name: canonical,
                entity_type,
            };

            edges.push(Edge {
                kind: EdgeKind::Mentions,
                from: NodeRef::Section(section_id),
                to: NodeRef::Entity(entity.id),
                provenance: Provenance::Ner,
                properties: Default::default(),
            });

            seen_in_chunk.entry(entity.id).or_insert_with(|| entity.clone());
            entities.push(entity);
        }

        let distinct: Vec<&Entity> = seen_in_chunk.values().collect();
        for i in 0..distinct.len() {
            for j in (i + 1)..distinct.len() {
                edges.push(Edge {
                    kind: EdgeKind::CoOccurs,
                    from: NodeRef::Entity(distinct[i].id),
                    to: NodeRef::Entity(distinct[j].id),
                    provenance: Provenance::Ner,
                    properties: Default::default(),
                });
            }
        }

        entities.sort_by_key(|e| e.id);
        entities.dedup_by_key(|e| e.id);

        Ok(Extraction { entities, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotmd_core::ids::ChunkId;

    struct StubBackend {
        mentions: Vec<Mention>,
    }

    #[async_trait]
    impl NerBackend for StubBackend {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn recognize(&self, _text: &str, _entity_types: &[String]) -> Result<Vec<Mention>> {
            Ok(self.mentions.clone())
        }
    }

    struct NullResolver;
    impl TitleResolver for NullResolver {
        fn resolve_title(&self, _title: &str) -> Option<String> {
            None
        }
    }

    fn sample_chunk() -> Chunk {
        Chunk {
            id: ChunkId::new("doc.md", 0),
            file_path: "doc.md".to_string(),
            ordinal: 0,
            heading_path: vec![],
            text: "Alice met Bob at Acme Corp.".to_string(),
            start_offset: 0,
            end_offset: 27,
            token_count: 6,
        }
    }

    fn sample_file() -> File {
        File {
            path: "doc.md".to_string(),
            title: "Doc".to_string(),
            checksum: "abc".to_string(),
            size: 10,
            mtime: chrono::Utc::now(),
            frontmatter: Default::default(),
            indexed_at: None,
        }
    }

    #[tokio::test]
    async fn emits_mentions_and_co_occurs_edges() {
        let backend = StubBackend {
            mentions: vec![
                Mention {
                    surface_form: "Alice".into(),
                    entity_type: "person".into(),
                    start: 0,
                    end: 5,
                    score: 0.9,
                },
                Mention {
                    surface_form: "Bob".into(),
                    entity_type: "person".into(),
                    start: 10,
                    end: 13,
                    score: 0.9,
                },
            ],
        };
        let extractor = NerExtractor::new(Box::new(backend), vec!["person".into()], 0.5);
        let extraction = extractor
            .extract(&sample_chunk(), &sample_file(), &NullResolver)
            .await
            .unwrap();

        assert_eq!(extraction.entities.len(), 2);
        let mentions = extraction
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Mentions)
            .count();
        let co_occurs = extraction
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::CoOccurs)
            .count();
        assert_eq!(mentions, 2);
        assert_eq!(co_occurs, 1);
    }

    #[tokio::test]
    async fn entities_below_score_floor_are_discarded() {
        let backend = StubBackend {
            mentions: vec![Mention {
                surface_form: "Maybe".into(),
                entity_type: "person".into(),
                start: 0,
                end: 5,
                score: 0.1,
            }],
        };
        let extractor = NerExtractor::new(Box::new(backend), vec!["person".into()], 0.5);
        let extraction = extractor
            .extract(&sample_chunk(), &sample_file(), &NullResolver)
            .await
            .unwrap();
        assert!(extraction.entities.is_empty());
        assert!(extraction.edges.is_empty());
    }

    #[tokio::test]
    async fn disabled_backend_never_finds_entities() {
        let extractor = NerExtractor::new(Box::new(DisabledNerBackend), vec!["person".into()], 0.5);
        let extraction = extractor
            .extract(&sample_chunk(), &sample_file(), &NullResolver)
            .await
            .unwrap();
        assert!(extraction.entities.is_empty());
    }
}
