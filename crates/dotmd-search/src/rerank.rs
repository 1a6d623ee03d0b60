//! Cross-encoder reranking: length penalty, score floor, snippet extraction.

use crate::models::{Candidate, EngineScoresDto, SearchResult};
use dotmd_core::tokenize_terms;
use dotmd_core::Result;
use dotmd_models::CrossEncoder;
use std::sync::Arc;

const SHORT_CHUNK_THRESHOLD: usize = 100;
const SNIPPET_MAX_CHARS: usize = 240;

pub struct Reranker {
    cross_encoder: Arc<dyn CrossEncoder>,
    score_floor: f32,
}

impl Reranker {
    pub fn new(cross_encoder: Arc<dyn CrossEncoder>, score_floor: f32) -> Self {
        Self {
            cross_encoder,
            score_floor,
        }
    }

    /// Scores every candidate against `query`, applies the length penalty
    /// and score floor, and returns the survivors sorted descending,
    /// truncated to `top_k`.
    pub async fn rerank(&self, query: &str, candidates: Vec<Candidate>, top_k: usize) -> Result<Vec<SearchResult>> {
        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let passage = passage_text(&candidate);
            let raw_score = self.cross_encoder.score(query, &passage).await?;
            let adjusted = apply_length_penalty(raw_score, candidate.text.len());
            if adjusted < self.score_floor {
                continue;
            }
            scored.push((adjusted, candidate));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, candidate)| to_result(candidate, score, query))
            .collect())
    }
}

fn passage_text(candidate: &Candidate) -> String {
    if candidate.heading_path.is_empty() {
        candidate.text.clone()
    } else {
        format!("{} {}", candidate.heading_path.join(" "), candidate.text)
    }
}

/// Chunks shorter than `SHORT_CHUNK_THRESHOLD` characters are penalised
/// multiplicatively: `factor = 0.5 + 0.5 * (len / 100)`.
fn apply_length_penalty(raw_score: f32, text_len: usize) -> f32 {
    if text_len >= SHORT_CHUNK_THRESHOLD {
        return raw_score;
    }
    let factor = 0.5 + 0.5 * (text_len as f32 / SHORT_CHUNK_THRESHOLD as f32);
    raw_score * factor
}

fn to_result(candidate: Candidate, score: f32, query: &str) -> SearchResult {
    SearchResult {
        chunk_id: candidate.chunk_id.to_string(),
        file_path: candidate.file_path,
        heading_path: candidate.heading_path,
        snippet: extract_snippet(&candidate.text, query),
        score,
        engine_scores: EngineScoresDto::from(candidate.engine_scores),
    }
}

/// The sentence with the strongest query-term overlap, plus one sentence of
/// surrounding context on either side; falls back to the chunk head if no
/// sentence overlaps at all. Capped at `SNIPPET_MAX_CHARS`.
pub(crate) fn extract_snippet(text: &str, query: &str) -> String {
    let query_terms: std::collections::HashSet<String> = tokenize_terms(query).into_iter().collect();
    let sentences = split_into_sentences(text);
    if sentences.is_empty() {
        return truncate_chars(text, SNIPPET_MAX_CHARS);
    }

    let best_idx = sentences
        .iter()
        .enumerate()
        .map(|(idx, sentence)| {
            let overlap = tokenize_terms(sentence)
                .into_iter()
                .filter(|t| query_terms.contains(t))
                .count();
            (idx, overlap)
        })
        .max_by_key(|(_, overlap)| *overlap)
        .filter(|(_, overlap)| *overlap > 0)
        .map(|(idx, _)| idx);

    let Some(idx) = best_idx else {
        return truncate_chars(&sentences[0], SNIPPET_MAX_CHARS);
    };

    let start = idx.saturating_sub(1);
    let end = (idx + 2).min(sentences.len());
    truncate_chars(&sentences[start..end].join(" "), SNIPPET_MAX_CHARS)
}

fn split_into_sentences(text: &str) -> Vec<String> {
    text.split(['.', '?', '!'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dotmd_core::ids::ChunkId;
    use crate::fusion::EngineScores;

    struct FixedScore(f32);

    #[async_trait]
    impl CrossEncoder for FixedScore {
        async fn score(&self, _query: &str, _passage: &str) -> Result<f32> {
            Ok(self.0)
        }
    }

    fn candidate(text: &str) -> Candidate {
        Candidate {
            chunk_id: ChunkId::new("doc.md", 0),
            file_path: "doc.md".to_string(),
            heading_path: vec!["Intro".to_string()],
            text: text.to_string(),
            fused_score: 0.0,
            engine_scores: EngineScores::default(),
        }
    }

    #[tokio::test]
    async fn length_penalty_matches_spec_arithmetic() {
        // A 40-character chunk scoring 3.0 should adjust to 3.0 * (0.5 + 0.5*0.4) = 2.1
        let text = "x".repeat(40);
        let reranker = Reranker::new(Arc::new(FixedScore(3.0)), -8.0);
        let results = reranker
            .rerank("query", vec![candidate(&text)], 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 2.1).abs() < 1e-4);
    }

    #[tokio::test]
    async fn candidates_below_floor_are_dropped_without_error() {
        // At or above the 100-char threshold no length penalty applies, so
        // the adjusted score is the raw score unchanged: -10.0 < -8.0.
        let text = "word ".repeat(25); // 125 chars, well past the threshold
        let reranker = Reranker::new(Arc::new(FixedScore(-10.0)), -8.0);
        let results = reranker.rerank("query", vec![candidate(&text)], 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn long_chunk_is_not_penalised() {
        let text = "word ".repeat(40); // well over 100 chars
        let reranker = Reranker::new(Arc::new(FixedScore(3.0)), -8.0);
        let results = reranker
            .rerank("query", vec![candidate(&text)], 10)
            .await
            .unwrap();
        assert!((results[0].score - 3.0).abs() < 1e-4);
    }
}
