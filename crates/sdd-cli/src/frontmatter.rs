//! Frontmatter handling for spec files.
//!
//! The block between the leading `---` fences is read as one `key: value`
//! pair per line rather than full YAML: spec templates legally carry
//! placeholder values such as `[PROJ-XXX]` that a YAML parser rejects.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

static FENCE_RE: OnceLock<Regex> = OnceLock::new();
static STRIP_RE: OnceLock<Regex> = OnceLock::new();

fn fence_re() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---").unwrap())
}

fn strip_re() -> &'static Regex {
    STRIP_RE.get_or_init(|| Regex::new(r"(?s)\A---\s*\n.*?\n---\s*\n").unwrap())
}

/// Key/value pairs from the leading frontmatter fence. `None` when the file
/// has no fence at all; an empty map when the fence holds no `key: value`
/// lines. Values keep their raw text, trimmed.
pub fn parse(content: &str) -> Option<BTreeMap<String, String>> {
    let caps = fence_re().captures(content)?;
    let block = caps.get(1)?.as_str();
    let mut fields = BTreeMap::new();
    for line in block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Some(fields)
}

/// The document body with the frontmatter fence removed.
pub fn strip(content: &str) -> &str {
    match strip_re().find(content) {
        Some(m) => &content[m.end()..],
        None => content,
    }
}
