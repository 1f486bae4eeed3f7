//! Monte-Carlo durability trials.
//!
//! A trial lays replicas out, then plays an endless stream of node and rack
//! failures against them, repairing each lost replica after an
//! exponentially distributed delay. The trial ends with `DataLoss` the
//! moment every replica of any sub-partition is simultaneously down, or
//! with `Survived` once the horizon passes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::cmp::Reverse;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::config::{ExperimentalConfiguration, PlacementParameters};
use crate::failures::{sample_exponential, FailureEventScheduler, FailureKind};
use crate::layout::decide_placement;

/// Odd constant with well-mixed bits, used to spread trial seeds apart.
const TRIAL_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Outcome of a single trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialResult {
    /// Some sub-partition lost its last replica at `time` hours.
    DataLoss {
        /// Hours from the start of the trial to the loss.
        time: f64,
    },
    /// No sub-partition ever lost all replicas before the horizon.
    Survived,
}

impl TrialResult {
    /// Whether the trial ended in data loss.
    #[must_use]
    pub fn is_data_loss(&self) -> bool {
        matches!(self, TrialResult::DataLoss { .. })
    }

    /// Time of loss, if any.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        match self {
            TrialResult::DataLoss { time } => Some(*time),
            TrialResult::Survived => None,
        }
    }
}

/// A scheduled replica repair. Ordered by completion time, then by
/// scheduling order so equal times pop deterministically.
#[derive(Debug, Clone, Copy)]
struct Repair {
    time: f64,
    seq: u64,
    partition: usize,
    slot: usize,
}

impl PartialEq for Repair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Repair {}

impl PartialOrd for Repair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Repair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.total_cmp(&other.time).then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Replays failure and repair streams against a static replica layout.
#[derive(Debug, Clone)]
pub struct RecoverySimulator {
    config: ExperimentalConfiguration,
    params: PlacementParameters,
}

impl RecoverySimulator {
    /// Build a simulator for one configuration and placement policy.
    #[must_use]
    pub fn new(config: ExperimentalConfiguration, params: PlacementParameters) -> Self {
        Self { config, params }
    }

    /// Run all configured trials sequentially.
    #[must_use]
    pub fn run(&self) -> Vec<TrialResult> {
        (0..self.config.trial_count).map(|trial| self.run_trial(trial)).collect()
    }

    /// Run all configured trials on the rayon pool. Results are identical
    /// to [`run`](Self::run): every trial derives its own seed, so the
    /// execution order cannot leak into the outcome.
    #[must_use]
    pub fn run_parallel(&self) -> Vec<TrialResult> {
        (0..self.config.trial_count)
            .into_par_iter()
            .map(|trial| self.run_trial(trial))
            .collect()
    }

    /// Run one trial. Fully determined by the configuration, the placement
    /// parameters and the trial index.
    #[must_use]
    pub fn run_trial(&self, trial: usize) -> TrialResult {
        let seed = self.config.seed.wrapping_add((trial as u64).wrapping_mul(TRIAL_SEED_STRIDE));
        let layout = decide_placement(&self.config, &self.params, seed);

        // Layout, failures and repair delays each get their own stream.
        let mut failures = FailureEventScheduler::new(
            self.config.node_count(),
            self.config.rack_count,
            self.config.node_mtbf,
            self.config.rack_mtbf,
            seed.wrapping_add(1),
        );
        let mut repair_rng = StdRng::seed_from_u64(seed.wrapping_add(2));

        // replica_home[node] lists the (partition, slot) replicas that node
        // hosts, so a node failure finds its victims without a scan.
        let mut replica_home: Vec<Vec<(usize, usize)>> = vec![Vec::new(); layout.node_count()];
        for (partition, homes) in layout.replicas.iter().enumerate() {
            for (slot, &node) in homes.iter().enumerate() {
                replica_home[node].push((partition, slot));
            }
        }

        let mut alive: Vec<Vec<bool>> =
            layout.replicas.iter().map(|homes| vec![true; homes.len()]).collect();
        let mut alive_count: Vec<usize> =
            layout.replicas.iter().map(Vec::len).collect();

        let mut repairs: BinaryHeap<Reverse<Repair>> = BinaryHeap::new();
        let mut repair_seq = 0u64;
        let mut now = 0.0f64;

        loop {
            let Some(event) = failures.next() else {
                return TrialResult::Survived;
            };
            now += event.delta;

            // Repairs that land before this failure take effect first.
            while let Some(Reverse(repair)) = repairs.peek().copied() {
                if repair.time > now {
                    break;
                }
                repairs.pop();
                if !alive[repair.partition][repair.slot] {
                    alive[repair.partition][repair.slot] = true;
                    alive_count[repair.partition] += 1;
                }
            }

            if now > self.config.horizon {
                return TrialResult::Survived;
            }

            let (victims, repair_mean) = match event.kind {
                FailureKind::Node => {
                    let mean = if self.params.striped_recovery {
                        self.config.striped_recovery_mean
                    } else {
                        self.config.node_recovery_mean
                    };
                    (vec![event.index], mean)
                }
                FailureKind::Rack => {
                    (layout.nodes_in_rack(event.index), self.config.rack_recovery_mean)
                }
            };

            for node in victims {
                for &(partition, slot) in &replica_home[node] {
                    if !alive[partition][slot] {
                        continue;
                    }
                    alive[partition][slot] = false;
                    alive_count[partition] -= 1;
                    if alive_count[partition] == 0 {
                        debug!(trial, partition, time = now, "last replica lost");
                        return TrialResult::DataLoss { time: now };
                    }
                    repair_seq += 1;
                    repairs.push(Reverse(Repair {
                        time: now + sample_exponential(&mut repair_rng, repair_mean),
                        seq: repair_seq,
                        partition,
                        slot,
                    }));
                }
            }
        }
    }
}

/// Aggregate statistics over a batch of trials.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    /// Trials run.
    pub trials: usize,
    /// Trials ending in data loss.
    pub losses: usize,
    /// `losses / trials`, zero when no trials ran.
    pub loss_probability: f64,
    /// Mean hours to loss across lost trials, absent when nothing was lost.
    pub mean_time_to_loss: Option<f64>,
}

impl std::fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} trials lost data (p = {:.4})",
            self.losses, self.trials, self.loss_probability
        )?;
        if let Some(mean) = self.mean_time_to_loss {
            write!(f, ", mean time to loss {mean:.1} h")?;
        }
        Ok(())
    }
}

/// Reduce trial outcomes to a summary.
#[must_use]
pub fn summarize(results: &[TrialResult]) -> SimulationSummary {
    let losses = results.iter().filter(|r| r.is_data_loss()).count();
    let loss_probability =
        if results.is_empty() { 0.0 } else { losses as f64 / results.len() as f64 };
    let mean_time_to_loss = if losses == 0 {
        None
    } else {
        let total: f64 = results.iter().filter_map(TrialResult::time).sum();
        Some(total / losses as f64)
    };
    SimulationSummary { trials: results.len(), losses, loss_probability, mean_time_to_loss }
}
