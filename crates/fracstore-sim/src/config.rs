//! Experiment configuration and placement-policy parameters.
//!
//! Everything here is a plain numeric value object; times are hours. The
//! configuration can be loaded from a TOML file so experiment definitions
//! are versionable alongside deployment parameters.

use serde::{Deserialize, Serialize};

use fracstore_core::{Error, Result};

/// Cluster shape and failure model for one simulation experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentalConfiguration {
    /// Number of racks in the simulated cluster.
    pub rack_count: usize,
    /// Number of nodes in each rack.
    pub nodes_per_rack: usize,
    /// Number of sub-partitions to lay out and track.
    pub sub_partition_count: usize,
    /// Mean time between node failures anywhere in the cluster, in hours.
    pub node_mtbf: f64,
    /// Mean time between whole-rack failures, in hours.
    pub rack_mtbf: f64,
    /// Mean time to re-replicate a replica lost to a node failure, in hours.
    pub node_recovery_mean: f64,
    /// Mean time to re-replicate a replica lost to a rack failure, in hours.
    pub rack_recovery_mean: f64,
    /// Mean recovery time when striped (chunked) recovery pulls from many
    /// sources at once, in hours.
    pub striped_recovery_mean: f64,
    /// Simulation horizon, in hours. Trials that reach it without data loss
    /// count as survivals.
    pub horizon: f64,
    /// Number of Monte-Carlo trials.
    pub trial_count: usize,
    /// Base seed; each trial derives its own seed from this and its index.
    pub seed: u64,
}

impl Default for ExperimentalConfiguration {
    fn default() -> Self {
        Self {
            rack_count: 10,
            nodes_per_rack: 10,
            sub_partition_count: 128,
            // A node every ~6 months, a rack every ~5 years.
            node_mtbf: 4_380.0,
            rack_mtbf: 43_800.0,
            node_recovery_mean: 24.0,
            rack_recovery_mean: 72.0,
            striped_recovery_mean: 2.0,
            // Ten years.
            horizon: 87_600.0,
            trial_count: 100,
            seed: 42,
        }
    }
}

impl ExperimentalConfiguration {
    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }

    /// Parse a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Total node count of the simulated cluster.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.rack_count * self.nodes_per_rack
    }
}

/// How a policy spreads the replicas of one sub-partition over racks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStyle {
    /// All replicas of a sub-partition live in one rack, so intra-rack
    /// recovery traffic never crosses the spine. Rack loss kills every
    /// replica at once.
    Buddy,
    /// Replicas are forced onto distinct racks, trading recovery locality
    /// for rack-failure tolerance.
    Spread,
}

/// Parameters distinguishing one placement policy from another.
///
/// The simulation engine itself is policy-agnostic; parameters only change
/// how [`crate::decide_placement`] distributes replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementParameters {
    /// Number of replicas per sub-partition.
    pub replication_factor: usize,
    /// Rack-level spreading style.
    pub style: PlacementStyle,
    /// Forbid two replicas of the same sub-partition on one node (soft:
    /// violated only when no alternative node exists).
    pub buddy_exclusion: bool,
    /// Model striped recovery: lost replicas are rebuilt from many sources
    /// in parallel, with the striped mean recovery time.
    pub striped_recovery: bool,
}

impl PlacementParameters {
    /// Column-store buddy placement: replicas co-located per rack, whole
    /// partitions recovered from the buddy copy.
    #[must_use]
    pub fn buddy(replication_factor: usize) -> Self {
        Self {
            replication_factor,
            style: PlacementStyle::Buddy,
            buddy_exclusion: true,
            striped_recovery: false,
        }
    }

    /// Block-scatter placement: replicas spread across racks, lost blocks
    /// re-striped from many sources.
    #[must_use]
    pub fn scatter(replication_factor: usize) -> Self {
        Self {
            replication_factor,
            style: PlacementStyle::Spread,
            buddy_exclusion: true,
            striped_recovery: true,
        }
    }
}
