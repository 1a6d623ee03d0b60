//! Maintenance operations kept out of the hot ingestion path: entities and
//! tags are never orphan-collected during indexing.

use dotmd_core::traits::GraphStore;
use dotmd_core::Result;
use tracing::info;

/// Deletes every entity with no incident edge. Invoked explicitly, e.g. by
/// the CLI's `dotmd gc` subcommand — never automatically during `index()`.
pub async fn gc_orphan_entities(graph: &dyn GraphStore) -> Result<usize> {
    let removed = graph.delete_orphan_entities().await?;
    info!(removed, "orphan entity garbage collection complete");
    Ok(removed)
}
