//! Splits a Markdown body into heading-scoped, token-bounded chunks.
//!
//! Splitting happens in two passes: first the document is split on ATX
//! headings into sections (a section's span runs to the next heading of
//! equal-or-shallower level, so a section's text includes any deeper
//! subheadings nested under it); second, any section whose token count
//! exceeds the configured bound is further split with a sentence-boundary
//! sliding window.

use dotmd_core::ids::ChunkId;
use dotmd_core::models::Chunk;

use crate::tokens::TokenCounter;

#[derive(Debug, Clone)]
struct HeadingLine {
    level: u8,
    text: String,
    line_idx: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            overlap_tokens: 50,
        }
    }
}

pub struct Chunker<'a> {
    config: ChunkerConfig,
    counter: &'a dyn TokenCounter,
}

impl<'a> Chunker<'a> {
    pub fn new(config: ChunkerConfig, counter: &'a dyn TokenCounter) -> Self {
        Self { config, counter }
    }

    /// `body` must already have frontmatter stripped.
    pub fn chunk(&self, file_path: &str, body: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = body.lines().collect();
        let headings = find_headings(&lines);

        let sections = if headings.is_empty() {
            vec![(Vec::new(), body.to_string(), 0usize, lines.len())]
        } else {
            build_sections(&lines, &headings)
        };

        let mut ordinal = 0usize;
        let mut chunks = Vec::new();
        for (heading_path, text, start_line, end_line) in sections {
            if text.trim().is_empty() {
                continue;
            }
            let start_offset = line_byte_offset(body, start_line);
            let end_offset = line_byte_offset(body, end_line);
            let token_count = self.counter.count(&text);

            if token_count <= self.config.max_tokens {
                chunks.push(Chunk {
                    id: ChunkId::new(file_path, ordinal),
                    file_path: file_path.to_string(),
                    ordinal,
                    heading_path: heading_path.clone(),
                    text: text.clone(),
                    start_offset,
                    end_offset,
                    token_count,
                });
                ordinal += 1;
            } else {
                for sub_text in self.sliding_window(&text) {
                    let sub_tokens = self.counter.count(&sub_text);
                    chunks.push(Chunk {
                        id: ChunkId::new(file_path, ordinal),
                        file_path: file_path.to_string(),
                        ordinal,
                        heading_path: heading_path.clone(),
                        text: sub_text,
                        start_offset,
                        end_offset,
                        token_count: sub_tokens,
                    });
                    ordinal += 1;
                }
            }
        }
        chunks
    }

    /// Sentence-boundary-aware sliding window: accumulates sentences until
    /// the token budget is hit, then backs up `overlap_tokens` worth of
    /// sentences for the next window.
    fn sliding_window(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return vec![text.to_string()];
        }

        let mut windows = Vec::new();
        let mut start = 0usize;
        while start < sentences.len() {
            let mut end = start;
            let mut window_tokens = 0usize;
            while end < sentences.len() {
                let sentence_tokens = self.counter.count(&sentences[end]);
                if window_tokens > 0 && window_tokens + sentence_tokens > self.config.max_tokens {
                    break;
                }
                window_tokens += sentence_tokens;
                end += 1;
            }
            if end == start {
                // a single sentence already exceeds the budget; take it whole
                end = start + 1;
            }
            windows.push(sentences[start..end].join(" "));

            if end >= sentences.len() {
                break;
            }

            // back up by roughly overlap_tokens worth of trailing sentences
            let mut back = end;
            let mut overlap_so_far = 0usize;
            while back > start && overlap_so_far < self.config.overlap_tokens {
                back -= 1;
                overlap_so_far += self.counter.count(&sentences[back]);
            }
            start = back.max(start + 1);
        }
        windows
    }
}

/// ATX headings outside fenced code blocks.
fn find_headings(lines: &[&str]) -> Vec<HeadingLine> {
    let mut headings = Vec::new();
    let mut in_fence = false;
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(heading) = parse_atx_heading(line, idx) {
            headings.push(heading);
        }
    }
    headings
}

fn parse_atx_heading(line: &str, idx: usize) -> Option<HeadingLine> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None; // e.g. "#tag", not a heading
    }
    Some(HeadingLine {
        level: level as u8,
        text: rest.trim().trim_end_matches('#').trim().to_string(),
        line_idx: idx,
    })
}

/// Builds (heading_path, text, start_line, end_line) for every heading,
/// where a heading's span runs to the next heading of equal-or-shallower
/// level (nested subheadings stay inside their ancestor's span).
fn build_sections(
    lines: &[&str],
    headings: &[HeadingLine],
) -> Vec<(Vec<String>, String, usize, usize)> {
    let mut sections = Vec::new();
    let mut stack: Vec<&HeadingLine> = Vec::new();

    for (i, heading) in headings.iter().enumerate() {
        while let Some(top) = stack.last() {
            if top.level >= heading.level {
                stack.pop();
            } else {
                break;
            }
        }

        let end_line = headings
            .iter()
            .skip(i + 1)
            .find(|h| h.level <= heading.level)
            .map(|h| h.line_idx)
            .unwrap_or(lines.len());

        let heading_path: Vec<String> = stack
            .iter()
            .map(|h| h.text.clone())
            .chain(std::iter::once(heading.text.clone()))
            .collect();

        let text = lines[heading.line_idx..end_line].join("\n");
        sections.push((heading_path, text, heading.line_idx, end_line));

        stack.push(heading);
    }

    sections
}

fn line_byte_offset(body: &str, line_idx: usize) -> usize {
    body.lines()
        .take(line_idx)
        .map(|l| l.len() + 1)
        .sum::<usize>()
        .min(body.len())
}

/// Splits on sentence boundaries (`.`/`?`/`!` followed by whitespace and a
/// capital letter, or end of text), skipping boundaries inside a backtick
/// code span. `regex` has no lookaround support, so this scans by hand.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut in_code_span = false;

    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == '`' {
            in_code_span = !in_code_span;
            i += 1;
            continue;
        }
        if !in_code_span && matches!(c, '.' | '?' | '!') {
            let mut j = i + 1;
            let mut saw_whitespace = false;
            while j < chars.len() && chars[j].is_whitespace() {
                saw_whitespace = true;
                j += 1;
            }
            let at_boundary = j >= chars.len() || chars[j].is_uppercase();
            if (saw_whitespace || j >= chars.len()) && at_boundary {
                let sentence: String = chars[start..i + 1].iter().collect();
                let trimmed = sentence.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let trimmed = tail.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::WhitespaceTokenCounter;

    fn chunker(max_tokens: usize, overlap: usize) -> Chunker<'static> {
        static COUNTER: WhitespaceTokenCounter = WhitespaceTokenCounter;
        Chunker::new(
            ChunkerConfig {
                max_tokens,
                overlap_tokens: overlap,
            },
            &COUNTER,
        )
    }

    #[test]
    fn file_with_no_headings_produces_one_chunk() {
        let chunks = chunker(512, 50).chunk("doc.md", "just some plain text\nwith two lines");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].heading_path.is_empty());
    }

    #[test]
    fn headings_become_separate_chunks_with_ancestor_path() {
        let body = "# Top\nintro text\n## Child\nchild text\n## Sibling\nsibling text";
        let chunks = chunker(512, 50).chunk("doc.md", body);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].heading_path, vec!["Top".to_string()]);
        assert_eq!(
            chunks[1].heading_path,
            vec!["Top".to_string(), "Child".to_string()]
        );
        assert_eq!(
            chunks[2].heading_path,
            vec!["Top".to_string(), "Sibling".to_string()]
        );
    }

    #[test]
    fn code_fence_headings_are_ignored() {
        let body = "# Real Heading\n```\n# not a heading\n```\nbody text";
        let chunks = chunker(512, 50).chunk("doc.md", body);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading_path, vec!["Real Heading".to_string()]);
    }

    #[test]
    fn section_over_token_budget_is_split_with_overlap() {
        let sentences: Vec<String> = (0..40)
            .map(|i| format!("Sentence number {i} has several words in it."))
            .collect();
        let body = format!("# Heading\n{}", sentences.join(" "));
        let chunks = chunker(50, 10).chunk("doc.md", &body);
        assert!(chunks.len() > 1, "expected section to split into multiple sub-chunks");
        for chunk in &chunks {
            assert_eq!(chunk.heading_path, vec!["Heading".to_string()]);
        }
    }

    #[test]
    fn chunk_ids_are_stable_across_identical_input() {
        let body = "# A\ntext";
        let first = chunker(512, 50).chunk("doc.md", body);
        let second = chunker(512, 50).chunk("doc.md", body);
        assert_eq!(first[0].id, second[0].id);
    }
}
