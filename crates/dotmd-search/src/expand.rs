//! Pure-function query expansion: acronym lookup and heading-structure
//! context. Never consults the vector or graph stores — the dense/sparse
//! retrievers embed or tokenise whatever this produces, nothing more.

use std::collections::HashMap;
use std::path::Path;

const BUILTIN_ACRONYMS: &[(&str, &str)] = &[
    ("NN", "Neural Networks"),
    ("NLP", "Natural Language Processing"),
    ("ML", "Machine Learning"),
    ("API", "Application Programming Interface"),
    ("CI", "Continuous Integration"),
    ("CD", "Continuous Deployment"),
    ("DB", "Database"),
    ("UI", "User Interface"),
];

/// Maps uppercase acronym tokens to their expansion, loaded from
/// `acronyms.toml` under the index directory if present, else a built-in
/// seed set.
#[derive(Debug, Clone, Default)]
pub struct AcronymDictionary {
    entries: HashMap<String, String>,
}

impl AcronymDictionary {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_ACRONYMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Loads `path` (expects a flat `[acronyms]` table of `KEY = "expansion"`
    /// pairs); falls back to the built-in seed set if the file is absent.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::builtin();
        }
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::builtin();
        };
        #[derive(serde::Deserialize)]
        struct File {
            #[serde(default)]
            acronyms: HashMap<String, String>,
        }
        match toml::from_str::<File>(&contents) {
            Ok(parsed) if !parsed.acronyms.is_empty() => Self {
                entries: parsed.acronyms,
            },
            _ => Self::builtin(),
        }
    }

    /// Exact match first, then fuzzy match (edit distance <= 1) on tokens of
    /// length >= 3. Returns at most one expansion per input token.
    fn lookup(&self, token: &str) -> Option<&str> {
        let upper = token.to_uppercase();
        if let Some(expansion) = self.entries.get(&upper) {
            return Some(expansion.as_str());
        }
        if upper.len() < 3 {
            return None;
        }
        self.entries
            .iter()
            .find(|(key, _)| key.len() >= 3 && strsim::levenshtein(key, &upper) <= 1)
            .map(|(_, v)| v.as_str())
    }
}

/// Heading titles known in the corpus, keyed case-insensitively, each mapped
/// to its full ancestor path.
#[derive(Debug, Clone, Default)]
pub struct HeadingIndex {
    by_lower_title: HashMap<String, Vec<String>>,
}

impl HeadingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_heading_paths(paths: impl IntoIterator<Item = Vec<String>>) -> Self {
        let mut by_lower_title = HashMap::new();
        for path in paths {
            if let Some(leaf) = path.last() {
                by_lower_title.insert(leaf.to_lowercase(), path);
            }
        }
        Self { by_lower_title }
    }

    fn ancestors_for(&self, token: &str) -> Option<&[String]> {
        self.by_lower_title
            .get(&token.to_lowercase())
            .map(|v| v.as_slice())
    }
}

pub struct QueryExpander {
    acronyms: AcronymDictionary,
    headings: HeadingIndex,
}

impl QueryExpander {
    pub fn new(acronyms: AcronymDictionary, headings: HeadingIndex) -> Self {
        Self { acronyms, headings }
    }

    /// Expands `query` by appending (never substituting) acronym expansions
    /// and ancestor-heading context terms.
    pub fn expand(&self, query: &str) -> String {
        let mut extra_terms: Vec<String> = Vec::new();

        for token in query.split_whitespace() {
            let cleaned = token.trim_matches(|c: char| !c.is_alphanumeric());
            if cleaned.is_empty() {
                continue;
            }
            if let Some(expansion) = self.acronyms.lookup(cleaned) {
                extra_terms.push(expansion.to_string());
            }
            if let Some(ancestors) = self.headings.ancestors_for(cleaned) {
                for ancestor in ancestors {
                    extra_terms.push(ancestor.clone());
                }
            }
        }

        if extra_terms.is_empty() {
            query.to_string()
        } else {
            format!("{query} {}", extra_terms.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_acronym_by_appending() {
        let expander = QueryExpander::new(AcronymDictionary::builtin(), HeadingIndex::new());
        let expanded = expander.expand("NN");
        assert!(expanded.contains("NN"));
        assert!(expanded.contains("Neural Networks"));
    }

    #[test]
    fn fuzzy_matches_acronym_within_edit_distance_one() {
        let expander = QueryExpander::new(AcronymDictionary::builtin(), HeadingIndex::new());
        let expanded = expander.expand("NLQ"); // NLP with one substitution
        assert!(expanded.contains("Natural Language Processing"));
    }

    #[test]
    fn unknown_token_is_passed_through_unexpanded() {
        let expander = QueryExpander::new(AcronymDictionary::builtin(), HeadingIndex::new());
        assert_eq!(expander.expand("cooking pasta"), "cooking pasta");
    }

    #[test]
    fn heading_match_contributes_ancestor_titles() {
        let headings = HeadingIndex::from_heading_paths(vec![vec![
            "Deploy".to_string(),
            "Rollback".to_string(),
        ]]);
        let expander = QueryExpander::new(AcronymDictionary::default(), headings);
        let expanded = expander.expand("rollback");
        assert!(expanded.contains("Deploy"));
    }
}
