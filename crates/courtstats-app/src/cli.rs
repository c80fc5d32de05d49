// Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resolve player identities between the reference and play-by-play sources
/// and build the enriched per-season tables.
#[derive(Debug, Parser)]
#[command(name = "courtstats")]
#[command(about = "Player identity resolution and season metrics pipeline")]
pub struct Cli {
    /// Project root holding defaults/, config/ and the data directory
    #[arg(short, long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Stage to run (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Resolve identities for every season and write the identity map
    Index,
    /// Merge and enrich every season from an existing identity map
    Merge,
    /// Index, merge, then attach the on/off supplement
    Run,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Index => "index",
            Command::Merge => "merge",
            Command::Run => "run",
        }
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}
