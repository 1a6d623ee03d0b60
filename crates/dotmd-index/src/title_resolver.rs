//! Resolves wikilink/markdown-link targets against known file titles.
//!
//! Built once per `index()` batch from a snapshot of every file title
//! already in the metadata store plus the titles discovered this batch, so
//! a link to a file indexed earlier in the same run (or an earlier run)
//! resolves even though files are processed one at a time.

use dotmd_core::traits::TitleResolver;
use std::collections::HashMap;

pub struct SnapshotTitleResolver {
    /// lower-cased title -> file path
    by_lower_title: HashMap<String, String>,
}

impl SnapshotTitleResolver {
    pub fn new() -> Self {
        Self {
            by_lower_title: HashMap::new(),
        }
    }

    pub fn insert(&mut self, title: &str, path: &str) {
        self.by_lower_title
            .insert(title.to_lowercase(), path.to_string());
    }
}

impl Default for SnapshotTitleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleResolver for SnapshotTitleResolver {
    fn resolve_title(&self, title: &str) -> Option<String> {
        self.by_lower_title.get(&title.to_lowercase()).cloned()
    }
}
