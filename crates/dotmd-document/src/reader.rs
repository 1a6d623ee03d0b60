//! File discovery: walks a root directory, filters to Markdown files,
//! honours `.dotmdignore`, and produces a checksum/title/mtime snapshot for
//! each discovered file.

use chrono::{DateTime, Utc};
use dotmd_core::{DotmdError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_128;

use crate::frontmatter::split_frontmatter;

/// A file discovered on disk, read but not yet chunked.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub content: String,
    pub title: String,
    pub checksum: String,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub frontmatter: std::collections::HashMap<String, String>,
}

/// Walks `root` for `.md`/`.markdown` files, skipping anything matched by a
/// `.dotmdignore` file at the root (one gitignore-style glob per line).
pub struct Reader {
    ignore_patterns: Vec<Regex>,
}

impl Reader {
    pub fn new(root: &Path) -> Result<Self> {
        let ignore_patterns = load_ignore_patterns(root)?;
        Ok(Self { ignore_patterns })
    }

    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_markdown = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("md") | Some("markdown")
            );
            if !is_markdown {
                continue;
            }
            if self.is_ignored(root, path) {
                continue;
            }
            paths.push(path.to_path_buf());
        }
        paths.sort();
        Ok(paths)
    }

    fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let relative_str = relative.to_string_lossy();
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.is_match(&relative_str))
    }

    pub fn read(&self, path: &Path) -> Result<DiscoveredFile> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DotmdError::read(path.display().to_string(), e.to_string()))?;
        let metadata = std::fs::metadata(path)
            .map_err(|e| DotmdError::read(path.display().to_string(), e.to_string()))?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .and_then(|d| DateTime::from_timestamp(d.as_secs() as i64, 0))
            .unwrap_or_else(Utc::now);

        let (frontmatter, body) = split_frontmatter(&content)
            .map_err(|e| DotmdError::parse(path.display().to_string(), e.to_string()))?;
        let title = extract_title(&body, path);
        let checksum = format!("{:032x}", xxh3_128(content.as_bytes()));

        Ok(DiscoveredFile {
            path: path.to_path_buf(),
            content,
            title,
            checksum,
            size: metadata.len(),
            mtime,
            frontmatter,
        })
    }
}

/// Title precedence: first H1, else filename stem.
fn extract_title(body: &str, path: &Path) -> String {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("# ") {
            return rest.trim().to_string();
        }
        if trimmed == "#" {
            continue;
        }
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_ignore_patterns(root: &Path) -> Result<Vec<Regex>> {
    let ignore_path = root.join(".dotmdignore");
    if !ignore_path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&ignore_path)
        .map_err(|e| DotmdError::read(ignore_path.display().to_string(), e.to_string()))?;
    let mut patterns = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(re) = glob_to_regex(line) {
            patterns.push(re);
        }
    }
    Ok(patterns)
}

/// Translates a small subset of gitignore-style globs (`*`, `**`, literal
/// path segments) into an anchored regex.
fn glob_to_regex(glob: &str) -> Option<Regex> {
    let mut pattern = String::from("(^|/)");
    for ch in glob.trim_start_matches('/').chars() {
        match ch {
            '*' => pattern.push_str("[^/]*"),
            '.' => pattern.push_str("\\."),
            '?' => pattern.push('.'),
            other => pattern.push(other),
        }
    }
    pattern.push_str("(/|$)");
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_only_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "# A").unwrap();
        fs::write(dir.path().join("b.txt"), "not markdown").unwrap();

        let reader = Reader::new(dir.path()).unwrap();
        let found = reader.discover(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.md"));
    }

    #[test]
    fn honours_dotmdignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".dotmdignore"), "drafts/\n").unwrap();
        fs::create_dir(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts/wip.md"), "# WIP").unwrap();
        fs::write(dir.path().join("keep.md"), "# Keep").unwrap();

        let reader = Reader::new(dir.path()).unwrap();
        let found = reader.discover(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("keep.md"));
    }

    #[test]
    fn title_falls_back_to_filename_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-heading.md");
        fs::write(&path, "just body text, no heading").unwrap();

        let reader = Reader::new(dir.path()).unwrap();
        let file = reader.read(&path).unwrap();
        assert_eq!(file.title, "no-heading");
    }

    #[test]
    fn title_prefers_heading_over_frontmatter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "---\ntitle: Custom Title\n---\n# Heading Title\n").unwrap();

        let reader = Reader::new(dir.path()).unwrap();
        let file = reader.read(&path).unwrap();
        assert_eq!(file.title, "Heading Title");
    }

    #[test]
    fn checksum_is_stable_for_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        fs::write(&path, "# Hello\nworld").unwrap();

        let reader = Reader::new(dir.path()).unwrap();
        let first = reader.read(&path).unwrap();
        let second = reader.read(&path).unwrap();
        assert_eq!(first.checksum, second.checksum);
    }
}
