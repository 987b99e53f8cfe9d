//! Frontmatter validation for spec files.

use std::path::Path;

use anyhow::{bail, Result};

use crate::frontmatter;
use crate::output::print_json;
use crate::specs;

/// Fields every spec must carry, non-empty.
pub const REQUIRED_FIELDS: [&str; 6] = ["title", "status", "domain", "issue", "created", "updated"];

/// The status lifecycle.
pub const VALID_STATUSES: [&str; 4] = ["active", "deprecated", "superseded", "archived"];

/// Issue values that mean "nobody filled this in yet".
const PLACEHOLDER_ISSUES: [&str; 5] = ["PROJ-XXX", "[PROJ-XXX]", "TODO", "{{ISSUE}}", ""];

/// Check one spec file. Returns every problem found, empty when valid.
pub fn validate_file(path: &Path) -> Vec<String> {
    if !path.is_file() {
        return vec![format!("File not found: {}", path.display())];
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return vec![format!("Cannot read {}: {e}", path.display())],
    };
    let Some(fields) = frontmatter::parse(&content) else {
        return vec![format!("Missing frontmatter in {}", path.display())];
    };

    let mut errors = Vec::new();
    for field in REQUIRED_FIELDS {
        if fields.get(field).map_or(true, |v| v.is_empty()) {
            errors.push(format!(
                "Missing required field '{field}' in {}",
                path.display()
            ));
        }
    }
    if let Some(status) = fields.get("status") {
        if !VALID_STATUSES.contains(&status.as_str()) {
            errors.push(format!(
                "Invalid status '{status}' in {}: must be one of {}",
                path.display(),
                VALID_STATUSES.join(", ")
            ));
        }
    }
    if let Some(issue) = fields.get("issue") {
        if PLACEHOLDER_ISSUES.contains(&issue.as_str()) {
            errors.push(format!(
                "Issue field is a placeholder in {}: reference a real issue",
                path.display()
            ));
        }
    }
    errors
}

pub fn run(specs_dir: &Path, path: Option<&Path>, all: bool, json: bool) -> Result<()> {
    if all {
        let paths = specs::spec_paths(specs_dir)?;
        let mut errors = Vec::new();
        for path in &paths {
            errors.extend(validate_file(path));
        }
        report(paths.len(), &errors, json)
    } else if let Some(path) = path {
        let errors = validate_file(path);
        if json {
            print_json(&serde_json::json!({
                "checked": 1,
                "errors": errors,
            }))?;
        } else if errors.is_empty() {
            println!("{} is valid", path.display());
        } else {
            println!("Validation errors:");
            for error in &errors {
                println!("  - {error}");
            }
        }
        if !errors.is_empty() {
            bail!("{} validation error(s)", errors.len());
        }
        Ok(())
    } else {
        bail!("pass a spec file or --all");
    }
}

fn report(checked: usize, errors: &[String], json: bool) -> Result<()> {
    if json {
        print_json(&serde_json::json!({
            "checked": checked,
            "errors": errors,
        }))?;
    } else if errors.is_empty() {
        println!("All {checked} specs are valid");
    } else {
        println!("Validation errors:");
        for error in errors {
            println!("  - {error}");
        }
    }
    if !errors.is_empty() {
        bail!("{} validation error(s)", errors.len());
    }
    Ok(())
}
