//! INDEX.md generation: one status-grouped table of every spec.

use std::path::Path;

use anyhow::{Context, Result};

use crate::output::print_json;
use crate::specs::{self, SpecFile};

pub fn run(specs_dir: &Path, json: bool) -> Result<()> {
    let content = generate(specs_dir)?;
    let path = specs_dir.join("INDEX.md");
    std::fs::write(&path, &content).with_context(|| format!("writing {}", path.display()))?;
    if json {
        print_json(&serde_json::json!({ "generated": path }))?;
    } else {
        println!("Generated {}", path.display());
    }
    Ok(())
}

pub fn generate(specs_dir: &Path) -> Result<String> {
    let all = specs::collect(specs_dir)?;

    let mut active = Vec::new();
    let mut deprecated = Vec::new();
    let mut archived = Vec::new();
    for spec in &all {
        match spec.status() {
            "active" => active.push(spec),
            "deprecated" => deprecated.push(spec),
            "archived" => archived.push(spec),
            // Superseded and anything unrecognized count toward the total
            // but get no table of their own.
            _ => {}
        }
    }
    for group in [&mut active, &mut deprecated, &mut archived] {
        group.sort_by(|a, b| a.created().cmp(b.created()));
    }

    let today = chrono::Local::now().format("%Y-%m-%d");
    let mut lines: Vec<String> = vec![
        "# Spec Index".into(),
        String::new(),
        format!("Last updated: {today}"),
        String::new(),
        format!(
            "Total: {} specs (Active: {}, Deprecated: {}, Archived: {})",
            all.len(),
            active.len(),
            deprecated.len(),
            archived.len()
        ),
        String::new(),
        "## Active Changes".into(),
        String::new(),
        "| Change | Type | Spec | Domain | Issue | Since |".into(),
        "|--------|------|------|--------|-------|-------|".into(),
    ];

    if active.is_empty() {
        lines.push("| *No active changes yet* | | | | | |".into());
    } else {
        for spec in &active {
            lines.push(table_row(spec));
        }
    }
    lines.push(String::new());

    lines.push("## Deprecated".into());
    lines.push(String::new());
    if deprecated.is_empty() {
        lines.push("*None*".into());
    } else {
        lines.push("| Change | Type | Spec | Domain | Issue | Deprecated |".into());
        lines.push("|--------|------|------|--------|-------|------------|".into());
        for spec in &deprecated {
            lines.push(table_row(spec));
        }
    }
    lines.push(String::new());

    lines.push("## Archived".into());
    lines.push(String::new());
    if archived.is_empty() {
        lines.push("*None*".into());
    } else {
        lines.push("| Change | Type | Spec | Domain | Issue | Archived |".into());
        lines.push("|--------|------|------|--------|-------|----------|".into());
        for spec in &archived {
            lines.push(table_row(spec));
        }
    }

    Ok(lines.join("\n") + "\n")
}

fn table_row(spec: &SpecFile) -> String {
    let path = spec.rel_path.display();
    let issue = if spec.issue().is_empty() {
        String::new()
    } else {
        format!("[{}](#)", spec.issue())
    };
    format!(
        "| {} | {} | [{path}]({path}) | {} | {issue} | {} |",
        spec.title(),
        spec.change_type(),
        spec.domain(),
        spec.created()
    )
}
