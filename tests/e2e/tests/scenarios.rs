//! Seed scenarios exercising the full index/search round trip across all
//! four stores: one scenario per coordinated behaviour (stable IDs,
//! heading-context ranking, acronym-driven graph traversal, entity
//! co-occurrence, length penalty, score floor).

mod support;

use dotmd_config::ExtractDepth;
use dotmd_core::ids::ChunkId;
use dotmd_core::SearchMode;
use dotmd_index::IndexOptions;
use dotmd_search::SearchOptions;
use std::sync::Arc;
use support::{
    models_with_cross_encoder, models_with_ner, open_engine, test_config, FixedCrossEncoder,
    PassthroughCrossEncoder, VocabularyNerBackend,
};

fn hybrid(rerank: bool) -> SearchOptions {
    SearchOptions {
        mode: SearchMode::Hybrid,
        top_k: 10,
        rerank,
        expand: true,
    }
}

/// A. A freshly indexed single-chunk file gets the chunk ID the ID scheme
/// promises: `hash(file_path + ":" + ordinal)`, nothing improvised.
#[tokio::test]
async fn scenario_a_single_chunk_chunk_id_matches_hash() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    let file_path = docs_dir.path().join("attention.md");
    std::fs::write(
        &file_path,
        "# Attention\nTransformers use attention mechanisms to weigh tokens.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(PassthroughCrossEncoder)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine
        .search("attention mechanisms", hybrid(false))
        .await
        .unwrap();
    assert!(!results.is_empty());

    let expected_id = ChunkId::new(&file_path.to_string_lossy(), 0);
    assert_eq!(results[0].chunk_id, expected_id.to_string());
}

/// B. A query that matches a file's heading context ranks that file first,
/// ahead of a file that only shares incidental vocabulary.
#[tokio::test]
async fn scenario_b_heading_context_ranks_relevant_file_first() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        docs_dir.path().join("deploy.md"),
        "# Deploying to Prod\nRun the release pipeline and promote the build to the production cluster.",
    )
    .unwrap();
    std::fs::write(
        docs_dir.path().join("cooking.md"),
        "# Weeknight Dinners\nA quick pasta recipe for busy evenings with garlic and olive oil.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 16);
    let engine = open_engine(config, models_with_cross_encoder(16, Arc::new(PassthroughCrossEncoder)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine.search("how to deploy to prod", hybrid(false)).await.unwrap();
    assert!(!results.is_empty());
    assert!(results[0].file_path.ends_with("deploy.md"));
}

/// C. An acronym in the query expands to its full form, which only the
/// chunk reachable over a LINKS_TO edge shares vocabulary with — it must
/// surface through graph traversal, not direct term overlap.
#[tokio::test]
async fn scenario_c_acronym_expansion_surfaces_linked_file_via_graph() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        docs_dir.path().join("acronyms.md"),
        "# Pattern Recognition\nOur approach relies on NN techniques for pattern recognition. See [[Layer Architecture]] for implementation details.",
    )
    .unwrap();
    std::fs::write(
        docs_dir.path().join("layers.md"),
        "# Layer Architecture\nConvolutional and recurrent layers stack into deep architectures for vision tasks.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 16);
    let engine = open_engine(config, models_with_cross_encoder(16, Arc::new(PassthroughCrossEncoder)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine.search("NN", hybrid(false)).await.unwrap();
    assert!(
        results.iter().any(|r| r.file_path.ends_with("layers.md")),
        "layers.md shares no literal vocabulary with the query; it should only surface via the \
         links_to edge reached from the acronym-expanded seed chunk"
    );
    let linked = results.iter().find(|r| r.file_path.ends_with("layers.md")).unwrap();
    assert!(
        linked.engine_scores.graph.is_some(),
        "layers.md must be fused in through the graph engine, not dense or sparse"
    );
    assert!(linked.engine_scores.dense.is_none());
    assert!(linked.engine_scores.sparse.is_none());
}

/// D. Two files that never link to each other but both mention the same
/// entity become reachable from one another purely through MENTIONS/
/// CO_OCCURS edges in the property graph.
#[tokio::test]
async fn scenario_d_shared_entity_surfaces_unlinked_file_via_graph() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        docs_dir.path().join("team.md"),
        "# Team\nAlice and Bob collaborate closely on the roadmap.",
    )
    .unwrap();
    std::fs::write(
        docs_dir.path().join("bob-infra.md"),
        "# Infra\nBob manages the deployment pipeline and monitoring system.",
    )
    .unwrap();

    let mut config = test_config(index_dir.path(), 16);
    config.extract.depth = ExtractDepth::Ner;
    let ner = VocabularyNerBackend {
        vocabulary: vec![("Alice", "person"), ("Bob", "person")],
    };
    let engine = open_engine(config, models_with_ner(16, Box::new(ner)));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine.search("Alice", hybrid(false)).await.unwrap();
    assert!(
        results.iter().any(|r| r.file_path.ends_with("bob-infra.md")),
        "bob-infra.md shares no vocabulary with \"Alice\"; it should only surface through the \
         entity graph, via the Bob entity both files mention"
    );
}

/// E. A short passage scored by the cross-encoder is multiplicatively
/// penalised by chunk length, end to end through the full rerank stage.
#[tokio::test]
async fn scenario_e_length_penalty_applied_end_to_end() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    // "# H\n" (4 bytes) + 36 'x' characters = a 40-byte chunk body.
    let body = format!("# H\n{}", "x".repeat(36));
    std::fs::write(docs_dir.path().join("short.md"), &body).unwrap();

    let config = test_config(index_dir.path(), 8);
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(FixedCrossEncoder(3.0))));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine.search(&"x".repeat(36), hybrid(true)).await.unwrap();
    assert_eq!(results.len(), 1);
    // 3.0 * (0.5 + 0.5 * (40/100)) = 2.1
    assert!((results[0].score - 2.1).abs() < 1e-4, "got score {}", results[0].score);
}

/// F. Every candidate scoring below the rerank floor is dropped; the search
/// returns an empty result set, never an error.
#[tokio::test]
async fn scenario_f_all_candidates_below_floor_returns_empty_without_error() {
    let index_dir = tempfile::tempdir().unwrap();
    let docs_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        docs_dir.path().join("doc.md"),
        "# Doc\nSome perfectly ordinary sentence that a cross-encoder will score very low for this test.",
    )
    .unwrap();

    let config = test_config(index_dir.path(), 8);
    // Default rerank_score_floor is -8.0; -20.0 always sinks below it.
    let engine = open_engine(config, models_with_cross_encoder(8, Arc::new(FixedCrossEncoder(-20.0))));
    engine.index(docs_dir.path(), IndexOptions::default()).await.unwrap();

    let results = engine.search("ordinary sentence", hybrid(true)).await.unwrap();
    assert!(results.is_empty());
}
