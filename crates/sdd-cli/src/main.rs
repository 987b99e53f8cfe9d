//! `sdd`: command-line tooling for a spec-driven project tree.

mod cmd;
mod frontmatter;
mod output;
mod specs;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sdd",
    about = "Spec-tree tooling: validate frontmatter, regenerate INDEX and SNAPSHOT, scaffold projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Specs directory
    #[arg(long, global = true, env = "SDD_SPECS_DIR", default_value = "specs")]
    specs_dir: PathBuf,

    /// Output as JSON
    #[arg(long, short = 'j', global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate spec frontmatter
    Validate {
        /// A single spec file to validate
        path: Option<PathBuf>,
        /// Validate every spec under the specs directory
        #[arg(long)]
        all: bool,
    },
    /// Regenerate INDEX.md from spec frontmatter
    Index,
    /// Regenerate SNAPSHOT.md from the active specs
    Snapshot,
    /// Scaffold a new spec-driven project
    Scaffold {
        /// Project name
        name: String,
        /// Target directory (default: ./<name>)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// One-line project description
        #[arg(long)]
        description: Option<String>,
        /// Primary business domain
        #[arg(long, default_value = "General")]
        domain: String,
        /// Component to scaffold; repeatable. `server` and `webapp`
        /// accept a `type:name` form, e.g. `server:api`.
        #[arg(long = "component", value_name = "COMPONENT")]
        components: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Validate { path, all } => {
            cmd::validate::run(&cli.specs_dir, path.as_deref(), all, cli.json)
        }
        Commands::Index => cmd::index::run(&cli.specs_dir, cli.json),
        Commands::Snapshot => cmd::snapshot::run(&cli.specs_dir, cli.json),
        Commands::Scaffold {
            name,
            dir,
            description,
            domain,
            components,
        } => cmd::scaffold::run(
            &name,
            dir.as_deref(),
            description.as_deref(),
            &domain,
            &components,
            cli.json,
        ),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
