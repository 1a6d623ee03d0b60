//! Token-classification NER backend: a local ONNX model maps sub-word
//! tokens to `B-<TYPE>`/`I-<TYPE>` labels, which are then grouped back into
//! surface-form spans and mapped onto the configured entity type set.

use async_trait::async_trait;
use dotmd_core::{DotmdError, Result};
use dotmd_extract::ner::{Mention, NerBackend};
use ndarray::{Array2, Axis};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;

pub struct OnnxNerBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    id2label: HashMap<usize, String>,
}

impl OnnxNerBackend {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let onnx_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let labels_path = model_dir.join("id2label.json");

        let session = Session::builder()
            .map_err(|e| DotmdError::internal(format!("failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DotmdError::internal(e.to_string()))?
            .commit_from_file(&onnx_path)
            .map_err(|e| {
                DotmdError::config(format!("failed to load NER model from {}: {e}", onnx_path.display()))
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            DotmdError::config(format!(
                "failed to load NER tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let id2label_raw = std::fs::read_to_string(&labels_path)
            .map_err(|e| DotmdError::read(labels_path.display().to_string(), e.to_string()))?;
        let id2label_str: HashMap<String, String> = serde_json::from_str(&id2label_raw)?;
        let id2label = id2label_str
            .into_iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|id| (id, v)))
            .collect();

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            id2label,
        })
    }

    /// Maps a model's raw label (often a full NER tag set like `PER`/`ORG`)
    /// onto the configured type names; unmapped labels become `None`.
    fn map_label(&self, label: &str, requested_types: &[String]) -> Option<String> {
        let bare = label.trim_start_matches("B-").trim_start_matches("I-");
        if bare.eq_ignore_ascii_case("O") {
            return None;
        }
        let mapped = match bare.to_uppercase().as_str() {
            "PER" | "PERSON" => "person",
            "ORG" | "ORGANIZATION" => "organization",
            "LOC" | "GPE" | "LOCATION" => "location",
            "MISC" => "concept",
            other => other,
        };
        let mapped = mapped.to_lowercase();
        if requested_types.iter().any(|t| t.eq_ignore_ascii_case(&mapped)) {
            Some(mapped)
        } else {
            None
        }
    }
}

#[async_trait]
impl NerBackend for OnnxNerBackend {
    fn name(&self) -> &'static str {
        "onnx-token-classification"
    }

    async fn recognize(&self, text: &str, entity_types: &[String]) -> Result<Vec<Mention>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| DotmdError::internal(format!("tokenization failed: {e}")))?;
        let seq_len = encoding.len();

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        let input_ids = Array2::from_shape_vec((1, seq_len), ids)
            .map_err(|e| DotmdError::internal(e.to_string()))?;
        let attention_mask = Array2::from_shape_vec((1, seq_len), mask)
            .map_err(|e| DotmdError::internal(e.to_string()))?;

        let input_ids_value = Value::from_array(input_ids)
            .map_err(|e| DotmdError::internal(format!("failed to build input_ids tensor: {e}")))?;
        let attention_mask_value = Value::from_array(attention_mask)
            .map_err(|e| DotmdError::internal(format!("failed to build attention_mask tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DotmdError::internal("NER session lock poisoned"))?;

        let outputs = session
            .run(
                ort::inputs![
                    "input_ids" => input_ids_value,
                    "attention_mask" => attention_mask_value,
                ]
                .map_err(|e| DotmdError::internal(format!("failed to build model inputs: {e}")))?,
            )
            .map_err(|e| DotmdError::internal(format!("NER inference failed: {e}")))?;

        let logits = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DotmdError::internal(format!("failed to read model output: {e}")))?;

        let offsets = encoding.get_offsets();
        let mut mentions = Vec::new();
        let mut current: Option<(String, usize, usize, f32, usize)> = None; // (label, start, end, score_sum, count)

        for (token_idx, token_logits) in logits.index_axis(Axis(0), 0).axis_iter(Axis(0)).enumerate() {
            let (best_idx, best_score) = softmax_argmax(token_logits.as_slice().unwrap_or(&[]));
            let label = self
                .id2label
                .get(&best_idx)
                .cloned()
                .unwrap_or_else(|| "O".to_string());
            let mapped = self.map_label(&label, entity_types);
            let (start, end) = offsets.get(token_idx).copied().unwrap_or((0, 0));

            match (&mut current, &mapped) {
                (Some((cur_label, _, cur_end, score_sum, count)), Some(new_label))
                    if cur_label == new_label && *cur_end == start =>
                {
                    *cur_end = end;
                    *score_sum += best_score;
                    *count += 1;
                }
                _ => {
                    if let Some((label, start, end, score_sum, count)) = current.take() {
                        push_mention(&mut mentions, text, &label, start, end, score_sum / count.max(1) as f32);
                    }
                    current = mapped.map(|label| (label, start, end, best_score, 1));
                }
            }
        }
        if let Some((label, start, end, score_sum, count)) = current.take() {
            push_mention(&mut mentions, text, &label, start, end, score_sum / count.max(1) as f32);
        }

        Ok(mentions)
    }
}

fn push_mention(mentions: &mut Vec<Mention>, text: &str, label: &str, start: usize, end: usize, score: f32) {
    if let Some(surface_form) = text.get(start..end) {
        if !surface_form.trim().is_empty() {
            mentions.push(Mention {
                surface_form: surface_form.to_string(),
                entity_type: label.to_string(),
                start,
                end,
                score,
            });
        }
    }
}

fn softmax_argmax(logits: &[f32]) -> (usize, f32) {
    if logits.is_empty() {
        return (0, 0.0);
    }
    let max_logit = logits.iter().cloned().fold(f32::MIN, f32::max);
    let exp_sum: f32 = logits.iter().map(|&l| (l - max_logit).exp()).sum();
    let (best_idx, best_logit) = logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, &v)| (i, v))
        .unwrap_or((0, 0.0));
    let score = ((best_logit - max_logit).exp()) / exp_sum.max(f32::EPSILON);
    (best_idx, score)
}
