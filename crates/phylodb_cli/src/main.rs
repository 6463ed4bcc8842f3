//! Command-line entry point.
//!
//! # Responsibility
//! - Bootstrap or upgrade a store file.
//! - Print a stored inference as a forest, plain or as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use phylodb_core::db::migrations::schema_version;
use phylodb_core::{
    init_logging_from, open_db_with, CoreConfig, InferenceKey, Tree, Vertex, VisualizationService,
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "phylodb", version, about = "Versioned typing-data store")]
struct Cli {
    /// TOML config file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "phylodb.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints the core version.
    Ping,
    /// Creates the store or brings its schema up to date.
    Migrate {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Rebuilds the tree of one inference run.
    Tree {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        project: Uuid,
        #[arg(long)]
        dataset: String,
        #[arg(long)]
        inference: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CoreConfig::load(&cli.config)
        .with_context(|| format!("loading config `{}`", cli.config.display()))?;
    if let Err(err) = init_logging_from(&config.logging) {
        bail!("logging setup failed: {err}");
    }

    match cli.command {
        Command::Ping => {
            println!("phylodb_core ping={}", phylodb_core::ping());
            println!("phylodb_core version={}", phylodb_core::core_version());
        }
        Command::Migrate { db } => {
            override_db_path(&mut config, db);
            let conn = open_db_with(&config.database).context("opening database")?;
            let version = schema_version(&conn).context("reading schema version")?;
            info!("event=cli_migrate module=cli status=ok schema={version}");
            println!("schema version {version}");
        }
        Command::Tree {
            db,
            project,
            dataset,
            inference,
            json,
        } => {
            override_db_path(&mut config, db);
            let conn = open_db_with(&config.database).context("opening database")?;
            let key = InferenceKey::new(project, dataset, inference);
            let service = VisualizationService::from_config(&conn, &config);
            let Some(tree) = service.tree(&key).context("rebuilding tree")? else {
                bail!("inference `{}` not found in dataset `{}`", key.id, key.dataset_id);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                print!("{}", render(&tree));
            }
        }
    }
    Ok(())
}

fn override_db_path(config: &mut CoreConfig, db: Option<PathBuf>) {
    if let Some(path) = db {
        config.database.path = Some(path);
        config.database.in_memory = false;
    }
}

/// Indented outline, one vertex per line.
fn render(tree: &Tree) -> String {
    let mut out = String::new();
    let mut pending: Vec<(&Vertex, usize)> = tree.roots.iter().rev().map(|root| (root, 0)).collect();
    while let Some((vertex, depth)) = pending.pop() {
        let indent = "  ".repeat(depth);
        if depth == 0 {
            out.push_str(&format!("{indent}{}\n", vertex.id));
        } else {
            out.push_str(&format!("{indent}{} ({})\n", vertex.id, vertex.distance));
        }
        pending.extend(vertex.children.iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{render, Cli};
    use clap::CommandFactory;
    use phylodb_core::{Tree, Vertex};

    fn leaf(id: &str, distance: i64) -> Vertex {
        Vertex {
            id: id.to_string(),
            distance,
            children: Vec::new(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_indents_children_with_distances() {
        let tree = Tree {
            roots: vec![Vertex {
                id: "A".to_string(),
                distance: 0,
                children: vec![leaf("B", 1), leaf("C", 2)],
            }],
        };
        assert_eq!(render(&tree), "A\n  B (1)\n  C (2)\n");
    }
}
