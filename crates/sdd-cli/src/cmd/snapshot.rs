//! SNAPSHOT.md generation: the current product state, compiled from the
//! overview sections of every active spec, grouped by domain.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::output::print_json;
use crate::specs::{self, SpecFile};

pub fn run(specs_dir: &Path, json: bool) -> Result<()> {
    let content = generate(specs_dir)?;
    let path = specs_dir.join("SNAPSHOT.md");
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

    let mut by_domain: BTreeMap<String, Vec<&SpecFile>> = BTreeMap::new();
    for spec in &all {
        // Strictly `status: active`; a spec without a status stays out of
        // the snapshot even though the index counts it as active.
        if spec.field("status") == Some("active") {
            by_domain.entry(spec.domain().to_string()).or_default().push(spec);
        }
    }
    for group in by_domain.values_mut() {
        group.sort_by_key(|spec| spec.title());
    }

    let today = chrono::Local::now().format("%Y-%m-%d");
    let mut lines: Vec<String> = vec![
        "# Product Snapshot".into(),
        String::new(),
        format!("Generated: {today}"),
        String::new(),
        "This document represents the current active state of the product by compiling all active specifications.".into(),
        String::new(),
    ];

    if !by_domain.is_empty() {
        lines.push("## Table of Contents".into());
        lines.push(String::new());
        for domain in by_domain.keys() {
            lines.push(format!("- [{domain}](#{})", anchor(domain)));
        }
        lines.push(String::new());
    }

    lines.push("## By Domain".into());
    lines.push(String::new());

    for (domain, group) in &by_domain {
        lines.push(format!("### {domain}"));
        lines.push(String::new());
        for spec in group {
            let path = spec.rel_path.display();
            lines.push(format!("#### {}", spec.title()));
            lines.push(format!("**Spec:** [{path}]({path})"));
            if !spec.issue().is_empty() {
                lines.push(format!("**Issue:** [{}](#)", spec.issue()));
            }
            lines.push(String::new());
            if let Some(overview) = spec.overview() {
                lines.push(overview.to_string());
                lines.push(String::new());
            }
            lines.push("---".into());
            lines.push(String::new());
        }
    }

    if by_domain.is_empty() {
        lines.push("*No active specs yet*".into());
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

fn anchor(heading: &str) -> String {
    heading.to_lowercase().replace(' ', "-")
}
