//! Shared test doubles for the end-to-end scenarios: a deterministic
//! stand-in embedder/cross-encoder/NER backend so the full engine can be
//! exercised without any real ONNX model on disk, the same way
//! `dotmd_index::engine`'s own unit tests do.

use async_trait::async_trait;
use dotmd_config::AppConfig;
use dotmd_core::Result;
use dotmd_extract::{Mention, NerBackend};
use dotmd_index::{Engine, ModelHandles};
use dotmd_models::{CrossEncoder, Embedder};
use std::path::Path;
use std::sync::Arc;

/// Hashes text into a small fixed-dimension vector so near-identical text
/// lands near itself in cosine space, without needing a loaded model.
pub struct HashEmbedder {
    pub dimension: usize,
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dimension];
                for (i, byte) in text.to_lowercase().bytes().enumerate() {
                    v[i % self.dimension] += byte as f32;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1.0);
                v.iter_mut().for_each(|x| *x /= norm);
                v
            })
            .collect())
    }
}

/// A cross-encoder that just returns passage length, so longer/more
/// relevant-looking passages don't get arbitrarily penalised in tests that
/// don't care about reranking specifics.
pub struct PassthroughCrossEncoder;

#[async_trait]
impl CrossEncoder for PassthroughCrossEncoder {
    async fn score(&self, _query: &str, passage: &str) -> Result<f32> {
        Ok(passage.len() as f32)
    }
}

/// A cross-encoder that always returns the same score, for exercising the
/// length penalty and score floor arithmetic end to end.
pub struct FixedCrossEncoder(pub f32);

#[async_trait]
impl CrossEncoder for FixedCrossEncoder {
    async fn score(&self, _query: &str, _passage: &str) -> Result<f32> {
        Ok(self.0)
    }
}

/// A zero-shot NER stand-in: recognises a fixed vocabulary of surface
/// forms by substring match. Good enough to exercise MENTIONS/CO_OCCURS
/// edge generation without a real model.
pub struct VocabularyNerBackend {
    pub vocabulary: Vec<(&'static str, &'static str)>,
}

#[async_trait]
impl NerBackend for VocabularyNerBackend {
    fn name(&self) -> &'static str {
        "vocabulary-stub"
    }

    async fn recognize(&self, text: &str, entity_types: &[String]) -> Result<Vec<Mention>> {
        let mut mentions = Vec::new();
        for (surface_form, entity_type) in &self.vocabulary {
            if !entity_types.iter().any(|t| t == entity_type) {
                continue;
            }
            if let Some(start) = text.find(surface_form) {
                mentions.push(Mention {
                    surface_form: surface_form.to_string(),
                    entity_type: entity_type.to_string(),
                    start,
                    end: start + surface_form.len(),
                    score: 0.95,
                });
            }
        }
        Ok(mentions)
    }
}

pub fn test_config(index_dir: &Path, dimension: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.index_dir = index_dir.to_path_buf();
    config.models.embedding_dimension = dimension;
    config
}

pub fn models_with_cross_encoder(dimension: usize, cross_encoder: Arc<dyn CrossEncoder>) -> ModelHandles {
    ModelHandles {
        embedder: Arc::new(HashEmbedder { dimension }),
        counter: Arc::new(dotmd_document::tokens::WhitespaceTokenCounter),
        cross_encoder: Some(cross_encoder),
        ner_backend: None,
    }
}

pub fn models_with_ner(dimension: usize, ner_backend: Box<dyn NerBackend>) -> ModelHandles {
    ModelHandles {
        embedder: Arc::new(HashEmbedder { dimension }),
        counter: Arc::new(dotmd_document::tokens::WhitespaceTokenCounter),
        cross_encoder: Some(Arc::new(PassthroughCrossEncoder)),
        ner_backend: Some(ner_backend),
    }
}

pub fn open_engine(config: AppConfig, models: ModelHandles) -> Engine {
    Engine::open_in_memory(config, models).expect("engine opens against an in-memory store set")
}
