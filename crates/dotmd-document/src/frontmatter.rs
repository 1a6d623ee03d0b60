//! YAML frontmatter extraction: a leading `---` fenced block, parsed to a
//! flat string-keyed map (non-scalar values are rendered back to YAML text).

use std::collections::HashMap;

pub fn split_frontmatter(content: &str) -> Result<(HashMap<String, String>, String), String> {
    let trimmed_start = content.trim_start_matches('\u{feff}');
    if !trimmed_start.starts_with("---") {
        return Ok((HashMap::new(), content.to_string()));
    }

    let mut lines = trimmed_start.lines();
    lines.next(); // opening fence

    let mut yaml_lines = Vec::new();
    let mut consumed_bytes = trimmed_start.find("---").map(|i| i + 3).unwrap_or(0);
    let mut closed = false;
    for line in lines {
        consumed_bytes += line.len() + 1;
        if line.trim() == "---" {
            closed = true;
            break;
        }
        yaml_lines.push(line);
    }

    if !closed {
        return Ok((HashMap::new(), content.to_string()));
    }

    let yaml_block = yaml_lines.join("\n");
    let body = trimmed_start
        .get(consumed_bytes.min(trimmed_start.len())..)
        .unwrap_or("")
        .trim_start_matches('\n')
        .to_string();

    if yaml_block.trim().is_empty() {
        return Ok((HashMap::new(), body));
    }

    let value: serde_yaml::Value =
        serde_yaml::from_str(&yaml_block).map_err(|e| format!("invalid frontmatter YAML: {e}"))?;

    let mut map = HashMap::new();
    if let serde_yaml::Value::Mapping(mapping) = value {
        for (key, val) in mapping {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                other => format!("{other:?}"),
            };
            let rendered = match val {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => serde_yaml::to_string(&other).unwrap_or_default().trim().to_string(),
            };
            map.insert(key, rendered);
        }
    }
    Ok((map, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_scalar_frontmatter() {
        let content = "---\ntitle: Hello World\ntags: rust\n---\n# Body\ntext";
        let (fm, body) = split_frontmatter(content).unwrap();
        assert_eq!(fm.get("title").unwrap(), "Hello World");
        assert_eq!(fm.get("tags").unwrap(), "rust");
        assert_eq!(body, "# Body\ntext");
    }

    #[test]
    fn no_frontmatter_returns_whole_body() {
        let content = "# Just a heading\nno frontmatter here";
        let (fm, body) = split_frontmatter(content).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn unclosed_fence_is_treated_as_no_frontmatter() {
        let content = "---\ntitle: broken\nno closing fence";
        let (fm, body) = split_frontmatter(content).unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }
}
