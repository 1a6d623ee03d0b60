//! The embedding model adapter: a local ONNX sentence-transformer run
//! through `ort`, tokenised with a HuggingFace fast tokenizer. No network
//! calls are made — both files must already exist under the configured
//! model directory.

use async_trait::async_trait;
use dotmd_core::{DotmdError, Result};
use dotmd_document::tokens::TokenCounter;
use ndarray::{Array2, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

use crate::pooling::{l2_normalize, mean_pool};

/// Encodes text into the same vector space the index was built with.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

impl OnnxEmbedder {
    pub fn load(model_dir: &Path, dimension: usize) -> Result<Self> {
        let onnx_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        let session = Session::builder()
            .map_err(|e| DotmdError::internal(format!("failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DotmdError::internal(e.to_string()))?
            .commit_from_file(&onnx_path)
            .map_err(|e| {
                DotmdError::config(format!(
                    "failed to load embedding model from {}: {e}",
                    onnx_path.display()
                ))
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DotmdError::config(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension,
        })
    }

    /// A `TokenCounter` that tokenises exactly the way this embedder does.
    pub fn token_counter(&self) -> TokenizerCounter {
        TokenizerCounter(self.tokenizer.clone())
    }

    fn encode_batch(&self, texts: &[String]) -> Result<(Array2<i64>, Array2<i64>)> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| DotmdError::internal(format!("tokenization failed: {e}")))?;

        let max_len = encodings.iter().map(|e| e.len()).max().unwrap_or(0).max(1);
        let batch = encodings.len();

        let mut input_ids = Array2::<i64>::zeros((batch, max_len));
        let mut attention_mask = Array2::<i64>::zeros((batch, max_len));

        for (row, encoding) in encodings.iter().enumerate() {
            for (col, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[[row, col]] = id as i64;
            }
            for (col, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[[row, col]] = mask as i64;
            }
        }

        Ok((input_ids, attention_mask))
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (input_ids, attention_mask) = self.encode_batch(texts)?;
        let batch = input_ids.shape()[0];
        let seq_len = input_ids.shape()[1];

        let input_ids_value = Value::from_array(input_ids.clone())
            .map_err(|e| DotmdError::internal(format!("failed to build input_ids tensor: {e}")))?;
        let attention_mask_value = Value::from_array(attention_mask.clone())
            .map_err(|e| DotmdError::internal(format!("failed to build attention_mask tensor: {e}")))?;
        let token_type_ids_value = Value::from_array(Array2::<i64>::zeros((batch, seq_len)))
            .map_err(|e| DotmdError::internal(format!("failed to build token_type_ids tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DotmdError::internal("embedding session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => attention_mask_value,
                "token_type_ids" => token_type_ids_value,
            ].map_err(|e| DotmdError::internal(format!("failed to build model inputs: {e}")))?)
            .map_err(|e| DotmdError::internal(format!("embedding inference failed: {e}")))?;

        let hidden_state = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DotmdError::internal(format!("failed to read model output: {e}")))?;

        let mut result = Vec::with_capacity(batch);
        for row in 0..batch {
            let mut token_embeddings = Vec::with_capacity(seq_len);
            for token in hidden_state.index_axis(Axis(0), row).axis_iter(Axis(0)) {
                token_embeddings.push(token.to_vec());
            }
            let mask_row: Vec<i64> = (0..seq_len).map(|col| attention_mask[[row, col]]).collect();
            let mut pooled = mean_pool(&token_embeddings, &mask_row);
            l2_normalize(&mut pooled);
            result.push(pooled);
        }
        Ok(result)
    }
}

/// Lets the document chunker count tokens exactly the way this embedder
/// would, so chunk boundaries line up with the 512-token bound.
pub struct TokenizerCounter(pub Tokenizer);

impl TokenCounter for TokenizerCounter {
    fn count(&self, text: &str) -> usize {
        self.0
            .encode(text, false)
            .map(|e| e.len())
            .unwrap_or_else(|_| text.split_whitespace().count())
    }
}
