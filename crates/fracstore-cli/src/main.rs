//! Fracsim: durability simulation front end for fracstore placement.

use anyhow::{Context, Result};
use clap::Parser;
use fracstore_sim::{
    summarize, ExperimentalConfiguration, PlacementParameters, RecoverySimulator, TrialResult,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;

use cli::{Cli, Commands, Policy, RunArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_simulation(args),
        Commands::Version => {
            println!("fracsim {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_simulation(args: RunArgs) -> Result<()> {
    init_logging();

    let mut config = match &args.config {
        Some(path) => ExperimentalConfiguration::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => ExperimentalConfiguration::default(),
    };
    if let Some(trials) = args.trials {
        config.trial_count = trials;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let params = match args.policy {
        Policy::Buddy => PlacementParameters::buddy(args.replication_factor),
        Policy::Scatter => PlacementParameters::scatter(args.replication_factor),
    };

    info!(
        racks = config.rack_count,
        nodes = config.node_count(),
        partitions = config.sub_partition_count,
        trials = config.trial_count,
        policy = ?args.policy,
        replication_factor = params.replication_factor,
        "starting simulation"
    );

    let simulator = RecoverySimulator::new(config, params);
    let results = if args.sequential { simulator.run() } else { simulator.run_parallel() };

    if args.show_trials {
        for (trial, result) in results.iter().enumerate() {
            match result {
                TrialResult::DataLoss { time } => {
                    println!("trial {trial:>4}: data loss at {time:.1} h");
                }
                TrialResult::Survived => println!("trial {trial:>4}: survived"),
            }
        }
    }

    println!("{}", summarize(&results));
    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
