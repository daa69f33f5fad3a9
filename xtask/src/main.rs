//! Maintenance tasks for gamedoc project packages
//!
//! Usage:
//!   cargo xtask new <path> [--settings <file>]   # Write an empty project package
//!   cargo xtask inspect <path>                   # Print the tree and record counts
//!   cargo xtask verify <path>                    # Report dangling references

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gamedoc::{AssetKind, Document, NodeId, NodeValue, PackageSettings, ProjectTree};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Maintenance tasks for gamedoc project packages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty project package
    New {
        path: PathBuf,
        /// RON file with package settings
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Load a package and print its contents
    Inspect { path: PathBuf },
    /// Load a package and check its references
    Verify { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::New { path, settings } => new_package(&path, settings.as_deref()),
        Commands::Inspect { path } => inspect(&path),
        Commands::Verify { path } => verify(&path),
    }
}

fn load(path: &Path) -> Result<Document> {
    Document::load(path, &AssetKind::ALL).with_context(|| format!("Failed to open {}", path.display()))
}

/// Write an empty project package
fn new_package(path: &Path, settings: Option<&Path>) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let settings = match settings {
        Some(file) => {
            PackageSettings::load(file).with_context(|| format!("Failed to read settings from {}", file.display()))?
        }
        None => PackageSettings::default(),
    };

    let document = Document::new_with_settings(settings);
    document
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "created project package");
    Ok(())
}

/// Print the project tree and record counts
fn inspect(path: &Path) -> Result<()> {
    let document = load(path)?;

    let tree = document.tree();
    print_node(tree, tree.root(), 0)?;
    println!();

    for kind in AssetKind::ALL {
        println!("{:<14} {}", kind.name(), document.library().count(kind));
    }
    println!("{:<14} {}", "Scenes", document.scenes().len());
    println!("{:<14} {}", "Resources", document.resources().len());
    println!("{:<14} {}", "Identifiers", document.issuer().borrow().len());
    Ok(())
}

fn print_node(tree: &ProjectTree, node: NodeId, depth: usize) -> Result<()> {
    let label = match tree.value(node)? {
        None => "folder".to_string(),
        Some(NodeValue::Scene(id)) => format!("scene {}", id),
        Some(NodeValue::Asset { kind, identifier }) => format!("{} {}", kind.name(), identifier),
    };
    println!("{}{} ({})", "  ".repeat(depth), tree.name(node)?, label);
    for &child in tree.children(node)? {
        print_node(tree, child, depth + 1)?;
    }
    Ok(())
}

/// Check references; fails when any is dangling
fn verify(path: &Path) -> Result<()> {
    let document = load(path)?;
    let issues = document.check_integrity();
    if issues.is_empty() {
        println!("{}: ok", path.display());
        return Ok(());
    }

    for issue in &issues {
        println!("{}", issue);
    }
    anyhow::bail!("{} dangling reference(s) in {}", issues.len(), path.display());
}
