//! Monte-Carlo recovery simulation for fracstore placement policies.
//!
//! The simulator is offline: given an [`ExperimentalConfiguration`] (cluster
//! shape, failure and recovery time constants) and a set of
//! [`PlacementParameters`], it derives a static replica layout over a
//! simulated rack/node topology, reusing the production placement queue,
//! and replays seeded stochastic failures against it, measuring how long
//! until some sub-partition loses its last replica before recovery
//! completes. The resulting time-to-data-loss distribution validates
//! placement parameters before deployment.
//!
//! # Usage
//!
//! ```
//! use fracstore_sim::{
//!     ExperimentalConfiguration, PlacementParameters, RecoverySimulator, summarize,
//! };
//!
//! let mut config = ExperimentalConfiguration::default();
//! config.trial_count = 20;
//! let params = PlacementParameters::buddy(3);
//!
//! let results = RecoverySimulator::new(config, params).run();
//! let summary = summarize(&results);
//! assert_eq!(summary.trials, 20);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod failures;
pub mod layout;
pub mod simulator;

pub use config::{ExperimentalConfiguration, PlacementParameters, PlacementStyle};
pub use failures::{FailureEvent, FailureEventScheduler, FailureKind};
pub use layout::{decide_placement, ReplicaLayout};
pub use simulator::{summarize, RecoverySimulator, SimulationSummary, TrialResult};
