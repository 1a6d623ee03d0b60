//! Cross-cutting invariants and boundary behaviours that don't belong to any
//! one scenario: idempotent re-indexing, removal on change, and the
//! empty-input cases every stage of the pipeline must handle without error.

mod support;

use dotmd_core::SearchMode;
use dotmd_index::IndexOptions;
use dotmd_search::SearchOptions;
use std::sync::Arc;
use support::{models_with_cross_encoder, open_engine, test_config, PassthroughCrossEncoder};

fn hybrid() -> SearchOptions {
    SearchOptions {
        mode: SearchMode::Hybrid,
        top_k: 10,
        rerank: false,
        expand: true,
    }
}

/// Re-indexing an unchanged directory is a no-op and reproduces byte-identical
/// chunk IDs and search results — re-indexing must never be the source of
/// drift for a stable corpus.
#[tokio::test]
async fn reindexing_unchanged_corpus_reproduces_identical_chunk_ids() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        docs_dir.path().join("doc.md"),
        "# Stable\nThis content never changes between index runs.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(PassthroughCrossEncoder)));

    let first_summary = engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();
    assert_eq!(first_summary.files_indexed, 1);
    let first_results = engine.search("content never changes", hybrid()).await.unwrap();

    let second_summary = engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();
    assert_eq!(second_summary.files_indexed, 0, "unchanged checksum must produce no writes");
    let second_results = engine.search("content never changes", hybrid()).await.unwrap();

    assert_eq!(first_results.len(), second_results.len());
    assert_eq!(first_results[0].chunk_id, second_results[0].chunk_id);

    let status = engine.status().await.unwrap();
    assert_eq!(status.files, 1);
    assert_eq!(status.chunks, 1);
}

/// Re-indexing a file whose content changed must remove every chunk from its
/// prior version out of every store, not just add the new ones.
#[tokio::test]
async fn reindexing_changed_file_removes_prior_chunks_everywhere() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    let path = docs_dir.path().join("doc.md");
    std::fs::write(
        &path,
        "# Intro\nOriginal introduction text.\n# Details\nOriginal details section text.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(PassthroughCrossEncoder)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let status = engine.status().await.unwrap();
    assert_eq!(status.chunks, 2, "two top-level headings produce two chunks");

    std::fs::write(&path, "# Summary\nA single, much shorter replacement section.").unwrap();
    let summary = engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();
    assert_eq!(summary.files_indexed, 1, "changed checksum must re-index the file");

    let status = engine.status().await.unwrap();
    assert_eq!(status.chunks, 1, "the old two-chunk version must be fully replaced, not appended to");

    let results = engine.search("original details section", hybrid()).await.unwrap();
    assert!(
        results.is_empty() || !results[0].file_path.ends_with("doc.md"),
        "vocabulary unique to the deleted version must not still be retrievable"
    );
}

/// An empty query string short-circuits before touching any retriever and
/// returns an empty result set, never an error.
#[tokio::test]
async fn empty_query_returns_empty_without_error() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(docs_dir.path().join("doc.md"), "# Doc\nSome content.").unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(PassthroughCrossEncoder)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine.search("   ", hybrid()).await.unwrap();
    assert!(results.is_empty());
}

/// Indexing an empty corpus still freezes the model identity (so `search`
/// doesn't fail with `IndexMissing`) and returns no results for any query.
#[tokio::test]
async fn empty_corpus_indexes_cleanly_and_searches_empty() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(PassthroughCrossEncoder)));
    let summary = engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();
    assert_eq!(summary.files_indexed, 0);

    let results = engine.search("anything at all", hybrid()).await.unwrap();
    assert!(results.is_empty());

    let status = engine.status().await.unwrap();
    assert_eq!(status.files, 0);
    assert_eq!(status.chunks, 0);
}

/// A file with no headings at all still produces exactly one retrievable
/// chunk, carried all the way through embedding, sparse indexing and graph
/// registration.
#[tokio::test]
async fn file_with_no_headings_is_indexed_as_a_single_chunk() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        docs_dir.path().join("flat.md"),
        "Just a flat paragraph of text with no heading markers anywhere in it.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(PassthroughCrossEncoder)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let status = engine.status().await.unwrap();
    assert_eq!(status.chunks, 1);

    let results = engine.search("flat paragraph", hybrid()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].heading_path.is_empty());
}
