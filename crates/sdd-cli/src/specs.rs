//! Walking the spec tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::frontmatter;

/// Files that live in the tree but are generated or reference material and
/// are never validated or indexed.
pub const GENERATED_FILES: [&str; 3] = ["INDEX.md", "SNAPSHOT.md", "glossary.md"];

/// One spec file with its parsed frontmatter.
#[derive(Debug)]
pub struct SpecFile {
    /// Path relative to the specs directory.
    pub rel_path: PathBuf,
    pub content: String,
    /// `None` when the file has no frontmatter fence at all.
    pub fields: Option<BTreeMap<String, String>>,
}

impl SpecFile {
    /// Raw field value. `Some("")` when the key is present but empty.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .as_ref()
            .and_then(|f| f.get(key))
            .map(String::as_str)
    }

    fn field_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.field(key).unwrap_or(default)
    }

    /// Title, defaulting to the file stem when the field is absent.
    pub fn title(&self) -> String {
        match self.field("title") {
            Some(t) => t.to_string(),
            None => self
                .rel_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    pub fn status(&self) -> &str {
        self.field_or("status", "active")
    }

    pub fn change_type(&self) -> &str {
        self.field_or("type", "feature")
    }

    pub fn domain(&self) -> &str {
        self.field_or("domain", "Unknown")
    }

    pub fn issue(&self) -> &str {
        self.field_or("issue", "")
    }

    pub fn created(&self) -> &str {
        self.field_or("created", "")
    }

    /// Text of the `## Overview` section of the body, up to the next
    /// heading. `None` when the section is absent or empty.
    pub fn overview(&self) -> Option<&str> {
        let body = frontmatter::strip(&self.content);
        let at = body.find("## Overview")?;
        let after = &body[at + "## Overview".len()..];
        let newline = after.find('\n')?;
        let section = &after[newline + 1..];
        let end = section.find("\n##").unwrap_or(section.len());
        let text = section[..end].trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Absolute paths of every `*.md` spec under `specs_dir`, recursively,
/// skipping generated files. Sorted for stable output.
pub fn spec_paths(specs_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    walk(specs_dir, &mut paths)?;
    paths.sort();
    Ok(paths)
}

/// Every spec under `specs_dir`, read and parsed.
pub fn collect(specs_dir: &Path) -> Result<Vec<SpecFile>> {
    let mut out = Vec::new();
    for path in spec_paths(specs_dir)? {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let rel_path = path
            .strip_prefix(specs_dir)
            .unwrap_or(&path)
            .to_path_buf();
        let fields = frontmatter::parse(&content);
        out.push(SpecFile {
            rel_path,
            content,
            fields,
        });
    }
    Ok(out)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "md") {
            let name = entry.file_name();
            if GENERATED_FILES.iter().any(|g| name == *g) {
                continue;
            }
            out.push(path);
        }
    }
    Ok(())
}
