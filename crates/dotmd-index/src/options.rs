use std::time::Duration;

/// Options accepted by `Engine::index`. A `deadline` bounds the whole batch;
/// work in flight when it expires is abandoned and the file it belongs to
/// is rolled back.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub deadline: Option<Duration>,
    /// Re-extract and re-embed every file regardless of checksum match.
    pub force: bool,
}
