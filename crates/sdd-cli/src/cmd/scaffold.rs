//! Project scaffolding: the specs tree, per-component directories, and the
//! generated starter files for a new spec-driven project.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::cmd::{index, snapshot};
use crate::output::print_json;

/// Component kinds the scaffolder knows how to lay out.
pub const KNOWN_COMPONENTS: [&str; 6] = ["contract", "server", "webapp", "helm", "testing", "cicd"];

/// Directories every project gets, component choice aside.
const SPECS_DIRS: [&str; 7] = [
    "specs",
    "specs/domain",
    "specs/domain/definitions",
    "specs/domain/use-cases",
    "specs/architecture",
    "specs/changes",
    "specs/external",
];

const CONFIG_DIRS: [&str; 2] = ["components/config", "components/config/schemas"];

const SERVER_SUBDIRS: [&str; 6] = [
    "src/operator",
    "src/config",
    "src/controller/http_handlers",
    "src/model/definitions",
    "src/model/use-cases",
    "src/dal",
];

const WEBAPP_SUBDIRS: [&str; 8] = [
    "src/pages",
    "src/components",
    "src/viewmodels",
    "src/models",
    "src/services",
    "src/stores",
    "src/types",
    "src/utils",
];

const TESTING_DIRS: [&str; 4] = [
    "components/testing/tests/integration",
    "components/testing/tests/component",
    "components/testing/tests/e2e",
    "components/testing/testsuites",
];

const GITIGNORE: &str = "node_modules/\n.env\n.DS_Store\ndist/\n*.log\n";

const README_TEMPLATE: &str = "# {{PROJECT_NAME}}

{{PROJECT_DESCRIPTION}}

Primary domain: {{PRIMARY_DOMAIN}}

Specifications live under `specs/`. Run `sdd validate --all`, `sdd index`
and `sdd snapshot` after changing them.
";

const GLOSSARY_TEMPLATE: &str = "# Glossary

Domain terms for {{PROJECT_NAME}}.

| Term | Definition |
|------|------------|
";

/// One `--component` argument: `type` or `type:name`. The named form gives
/// the instance its own directory, e.g. `server:api` lands in `server-api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub kind: String,
    pub name: Option<String>,
    pub dir_name: String,
}

pub fn parse_component(raw: &str) -> Component {
    match raw.split_once(':') {
        Some((kind, name)) => Component {
            kind: kind.to_string(),
            name: Some(name.to_string()),
            dir_name: format!("{kind}-{name}"),
        },
        None => Component {
            kind: raw.to_string(),
            name: None,
            dir_name: raw.to_string(),
        },
    }
}

fn substitute(template: &str, name: &str, description: &str, domain: &str) -> String {
    template
        .replace("{{PROJECT_NAME}}", name)
        .replace("{{PROJECT_DESCRIPTION}}", description)
        .replace("{{PRIMARY_DOMAIN}}", domain)
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

struct Scaffolded {
    dirs: Vec<String>,
    files: Vec<String>,
}

pub fn run(
    name: &str,
    dir: Option<&Path>,
    description: Option<&str>,
    domain: &str,
    components: &[String],
    json: bool,
) -> Result<()> {
    let components: Vec<Component> = components.iter().map(|c| parse_component(c)).collect();
    for component in &components {
        if !KNOWN_COMPONENTS.contains(&component.kind.as_str()) {
            bail!(
                "unknown component type '{}': expected one of {}",
                component.kind,
                KNOWN_COMPONENTS.join(", ")
            );
        }
    }

    let target = dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(name));
    let description = description
        .map(str::to_string)
        .unwrap_or_else(|| format!("A {name} project"));

    let result = scaffold(&target, name, &description, domain, &components)?;

    if json {
        print_json(&serde_json::json!({
            "name": name,
            "target_dir": target,
            "created_dirs": result.dirs.len(),
            "created_files": result.files.len(),
            "files": result.files,
        }))?;
    } else {
        println!("Scaffolded '{name}' at {}", target.display());
        println!(
            "  {} directories, {} files",
            result.dirs.len(),
            result.files.len()
        );
    }
    Ok(())
}

fn scaffold(
    target: &Path,
    name: &str,
    description: &str,
    domain: &str,
    components: &[Component],
) -> Result<Scaffolded> {
    let mut dirs: Vec<String> = Vec::new();
    let mut files: Vec<String> = Vec::new();

    let mut mkdir = |rel: String| -> Result<()> {
        let path = target.join(&rel);
        std::fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
        tracing::debug!(dir = %rel, "created");
        dirs.push(rel);
        Ok(())
    };

    for d in SPECS_DIRS {
        mkdir(d.to_string())?;
    }
    // The config component is not optional; every project carries one.
    for d in CONFIG_DIRS {
        mkdir(d.to_string())?;
    }

    for component in components {
        match component.kind.as_str() {
            "contract" => mkdir(format!("components/{}", component.dir_name))?,
            "server" => {
                for sub in SERVER_SUBDIRS {
                    mkdir(format!("components/{}/{sub}", component.dir_name))?;
                }
            }
            "webapp" => {
                for sub in WEBAPP_SUBDIRS {
                    mkdir(format!("components/{}/{sub}", component.dir_name))?;
                }
            }
            "helm" => mkdir(format!("components/{}", component.dir_name))?,
            "testing" => {
                for d in TESTING_DIRS {
                    mkdir(d.to_string())?;
                }
            }
            "cicd" => mkdir(".github/workflows".to_string())?,
            _ => {}
        }
    }

    let mut write = |rel: &str, content: String| -> Result<()> {
        let path = target.join(rel);
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(file = rel, "created");
        files.push(rel.to_string());
        Ok(())
    };

    write(".gitignore", GITIGNORE.to_string())?;
    write("README.md", substitute(README_TEMPLATE, name, description, domain))?;
    write(
        "specs/domain/glossary.md",
        substitute(GLOSSARY_TEMPLATE, name, description, domain),
    )?;
    write(
        "specs/architecture/overview.md",
        architecture_overview(name, components),
    )?;

    // Generate INDEX.md and SNAPSHOT.md with the real generators so the
    // fresh tree starts out in sync with them.
    let specs_dir = target.join("specs");
    std::fs::write(specs_dir.join("INDEX.md"), index::generate(&specs_dir)?)?;
    files.push("specs/INDEX.md".to_string());
    std::fs::write(specs_dir.join("SNAPSHOT.md"), snapshot::generate(&specs_dir)?)?;
    files.push("specs/SNAPSHOT.md".to_string());

    Ok(Scaffolded { dirs, files })
}

fn architecture_overview(name: &str, components: &[Component]) -> String {
    let mut out = format!(
        "# Architecture Overview\n\nThis document describes the architecture of {name}.\n\n## Components\n\n"
    );
    out.push_str("- **Config** (`components/config/`): YAML-based configuration management\n");
    for component in components {
        let dir = &component.dir_name;
        match component.kind.as_str() {
            "contract" => out.push_str(
                "- **Contract** (`components/contract/`): API contracts and type generation\n",
            ),
            "helm" => {
                out.push_str("- **Helm** (`components/helm/`): Kubernetes deployment charts\n")
            }
            "testing" => {
                out.push_str("- **Testing** (`components/testing/`): Suite and test definitions\n")
            }
            "cicd" => out.push_str("- **CI/CD** (`.github/workflows/`): Pipeline definitions\n"),
            "server" => {
                let display = title_case(component.name.as_deref().unwrap_or("Server"));
                out.push_str(&format!(
                    "- **{display}** (`components/{dir}/`): Backend service\n"
                ));
            }
            "webapp" => {
                let display = title_case(component.name.as_deref().unwrap_or("Webapp"));
                out.push_str(&format!(
                    "- **{display}** (`components/{dir}/`): Frontend application\n"
                ));
            }
            _ => {}
        }
    }
    out
}
