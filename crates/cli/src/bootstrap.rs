//! Wires the on-disk model files named in configuration into the
//! `ModelHandles` the engine needs. Kept in the binary, not in
//! `dotmd-index`, per the core's "caller owns the model singleton" design.

use anyhow::{Context, Result};
use dotmd_config::{AppConfig, ExtractDepth};
use dotmd_index::ModelHandles;
use dotmd_models::{OnnxCrossEncoder, OnnxEmbedder, OnnxNerBackend};
use std::sync::Arc;

pub fn load_models(config: &AppConfig) -> Result<ModelHandles> {
    let embedder = OnnxEmbedder::load(&config.models.embedding_model_path, config.models.embedding_dimension)
        .with_context(|| {
            format!(
                "loading embedding model from {}",
                config.models.embedding_model_path.display()
            )
        })?;
    let counter = embedder.token_counter();
    let embedder = Arc::new(embedder);

    let cross_encoder = OnnxCrossEncoder::load(&config.models.cross_encoder_model_path)
        .with_context(|| {
            format!(
                "loading cross-encoder model from {}",
                config.models.cross_encoder_model_path.display()
            )
        })?;

    let ner_backend: Option<Box<dyn dotmd_extract::NerBackend>> = if config.extract.depth == ExtractDepth::Ner {
        let path = config
            .models
            .ner_model_path
            .as_ref()
            .context("extract.depth is \"ner\" but no ner_model_path is configured")?;
        Some(Box::new(
            OnnxNerBackend::load(path).with_context(|| format!("loading NER model from {}", path.display()))?,
        ))
    } else {
        None
    };

    Ok(ModelHandles {
        embedder,
        counter: Arc::new(counter),
        cross_encoder: Some(Arc::new(cross_encoder)),
        ner_backend,
    })
}
