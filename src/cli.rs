use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI. Running without a subcommand applies the manifest.
#[derive(Parser, Debug)]
#[command(
    name = "skelgen",
    version,
    about = "Create an empty backend/frontend directory and file skeleton"
)]
pub struct Cli {
    #[arg(short = 'C', long = "chdir", global = true)]
    pub chdir: Option<PathBuf>,
    /// Manifest to use instead of `skelgen.toml` or the built-in layout.
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,
    /// Override the base directory of the `backend` batch.
    #[arg(long = "server-dir", global = true)]
    pub server_dir: Option<String>,
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the directories and empty files described by the manifest.
    Apply,
    /// Print the resolved manifest.
    Show,
    /// Write the built-in manifest to a file for editing.
    Generate {
        #[arg()]
        path: Option<PathBuf>,
        #[arg(long = "force", default_value_t = false)]
        force: bool,
    },
}

/// Helper entry point so `main` can stay minimal.
pub fn parse() -> Cli {
    Cli::parse()
}
