//! The term tokeniser shared by the sparse index builder and the sparse
//! retriever. Both sides of `bm25_index.bin` must split text identically —
//! this is the one place that happens, so indexing and querying can never
//! drift apart (see the sparse retriever's "same tokeniser as indexing").

/// Lowercases and splits on runs of non-alphanumeric characters. No
/// stemming, no stopword list: BM25's own IDF term already down-weights
/// ubiquitous tokens.
pub fn tokenize_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_lowercases() {
        assert_eq!(
            tokenize_terms("Attention Is All You Need!"),
            vec!["attention", "is", "all", "you", "need"]
        );
    }

    #[test]
    fn empty_text_yields_no_terms() {
        assert!(tokenize_terms("").is_empty());
        assert!(tokenize_terms("   ...   ").is_empty());
    }
}
