use anyhow::Context;
use cartograph::{GraphBuilder, IndexConfig, MemorySink};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Command::Index {
            repo,
            project_name,
            ignore,
            output,
        } => {
            let config = IndexConfig::new(&repo, project_name)
                .with_context(|| format!("configuring index for {}", repo.display()))?
                .with_ignores(ignore);

            let builder = GraphBuilder::new(config)?;
            let mut sink = MemorySink::new();
            let stats = builder.run(&mut sink)?;

            tracing::info!(
                files = stats.files_parsed,
                modules = stats.modules_indexed,
                call_edges = stats.call_edges,
                unresolved = stats.unresolved_calls,
                "indexing complete"
            );

            let graph = serde_json::to_string_pretty(&sink.to_json())?;
            match output {
                Some(path) => {
                    std::fs::write(&path, graph)
                        .with_context(|| format!("writing graph to {}", path.display()))?;
                }
                None => println!("{graph}"),
            }
        }
    }

    Ok(())
}
