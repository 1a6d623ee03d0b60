//! Cross-encoder reranking model: scores a `(query, passage)` pair jointly
//! in a single forward pass, producing a raw relevance logit.

use async_trait::async_trait;
use dotmd_core::{DotmdError, Result};
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

#[async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn score(&self, query: &str, passage: &str) -> Result<f32>;
}

pub struct OnnxCrossEncoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl OnnxCrossEncoder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let onnx_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        let session = Session::builder()
            .map_err(|e| DotmdError::internal(format!("failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DotmdError::internal(e.to_string()))?
            .commit_from_file(&onnx_path)
            .map_err(|e| {
                DotmdError::config(format!(
                    "failed to load cross-encoder model from {}: {e}",
                    onnx_path.display()
                ))
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DotmdError::config(format!(
                "failed to load cross-encoder tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

#[async_trait]
impl CrossEncoder for OnnxCrossEncoder {
    async fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let encoding = self
            .tokenizer
            .encode((query, passage), true)
            .map_err(|e| DotmdError::internal(format!("tokenization failed: {e}")))?;

        let seq_len = encoding.len();
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let input_ids = Array2::from_shape_vec((1, seq_len), ids)
            .map_err(|e| DotmdError::internal(e.to_string()))?;
        let attention_mask = Array2::from_shape_vec((1, seq_len), mask)
            .map_err(|e| DotmdError::internal(e.to_string()))?;
        let token_type_ids = Array2::from_shape_vec((1, seq_len), type_ids)
            .map_err(|e| DotmdError::internal(e.to_string()))?;

        let input_ids_value = Value::from_array(input_ids)
            .map_err(|e| DotmdError::internal(format!("failed to build input_ids tensor: {e}")))?;
        let attention_mask_value = Value::from_array(attention_mask)
            .map_err(|e| DotmdError::internal(format!("failed to build attention_mask tensor: {e}")))?;
        let token_type_ids_value = Value::from_array(token_type_ids)
            .map_err(|e| DotmdError::internal(format!("failed to build token_type_ids tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DotmdError::internal("cross-encoder session lock poisoned"))?;

        let outputs = session
            .run(
                ort::inputs![
                    "input_ids" => input_ids_value,
                    "attention_mask" => attention_mask_value,
                    "token_type_ids" => token_type_ids_value,
                ]
                .map_err(|e| DotmdError::internal(format!("failed to build model inputs: {e}")))?,
            )
            .map_err(|e| DotmdError::internal(format!("cross-encoder inference failed: {e}")))?;

        let logits = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DotmdError::internal(format!("failed to read model output: {e}")))?;

        logits
            .iter()
            .next()
            .copied()
            .ok_or_else(|| DotmdError::internal("cross-encoder returned no logits"))
    }
}
