//! Command line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Fracsim: Monte-Carlo durability simulator for fracstore placement
/// policies.
#[derive(Parser)]
#[command(name = "fracsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a batch of durability trials.
    Run(RunArgs),
    /// Print version information.
    Version,
}

/// Placement policy under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Co-locate all replicas of a sub-partition in one rack.
    Buddy,
    /// Spread replicas of a sub-partition across distinct racks.
    Scatter,
}

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Path to a TOML experiment configuration. Defaults are used when
    /// omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Placement policy to simulate.
    #[arg(short, long, default_value = "buddy")]
    pub policy: Policy,

    /// Replicas per sub-partition.
    #[arg(short, long, default_value = "3")]
    pub replication_factor: usize,

    /// Override the configured trial count.
    #[arg(long)]
    pub trials: Option<usize>,

    /// Override the configured base seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run trials one at a time instead of on the thread pool.
    #[arg(long)]
    pub sequential: bool,

    /// Print the outcome of every trial, not just the summary.
    #[arg(long)]
    pub show_trials: bool,
}
