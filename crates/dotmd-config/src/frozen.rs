//! `config.json`: the model identities and tokeniser parameters frozen at
//! index build time. Query-time configuration is checked against this
//! snapshot on every `search()` call; a mismatch is a fatal `ModelMismatch`.

use crate::models::{AppConfig, Bm25Params, GraphWeights, ModelIdentity};
use dotmd_core::{DotmdError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrozenConfig {
    pub embedding: ModelIdentity,
    pub cross_encoder_model_path: String,
    pub bm25: Bm25Params,
    pub graph_weights: GraphWeights,
}

impl FrozenConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            embedding: config.model_identity(),
            cross_encoder_model_path: config.models.cross_encoder_model_path.display().to_string(),
            bm25: config.search.bm25,
            graph_weights: config.search.graph_weights.clone(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DotmdError::index_write("config.json", e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| DotmdError::index_write("config.json", e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DotmdError::read(path.display().to_string(), e.to_string()))?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Checks the currently configured embedding model against the one the
    /// index was built with. Called before every query-path retrieval.
    pub fn check_model_match(&self, configured: &ModelIdentity) -> Result<()> {
        if &self.embedding != configured {
            return Err(DotmdError::model_mismatch(
                format!("{} (dim {})", self.embedding.name, self.embedding.dimension),
                format!("{} (dim {})", configured.name, configured.dimension),
            ));
        }
        Ok(())
    }
}
