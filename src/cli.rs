//! CLI definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cartograph",
    version,
    about = "Index a repository into a typed code graph"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging (repeat for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index a repository and emit the graph as JSON
    Index {
        /// Repository root to index
        repo: PathBuf,

        /// Project name (defaults to the repository directory name)
        #[arg(long)]
        project_name: Option<String>,

        /// Extra directory names to skip
        #[arg(long)]
        ignore: Vec<String>,

        /// Write the JSON graph here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
