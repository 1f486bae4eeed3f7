//! Stochastic failure-event generation.
//!
//! Node failures and rack failures are two independent Poisson processes:
//! inter-arrival times are exponential with the configured class-level mean
//! time between failures. The scheduler interleaves them by always emitting
//! whichever class fires sooner, and draws the failed entity's index
//! uniformly at emission time. Everything is driven by one seeded RNG, so an
//! identical seed and configuration reproduce an identical event stream.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Which failure class an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A single node failed.
    Node,
    /// A whole rack failed.
    Rack,
}

/// One stochastic failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureEvent {
    /// Time since the previous event, in hours. Strictly positive.
    pub delta: f64,
    /// Failure class.
    pub kind: FailureKind,
    /// Index of the failed entity: `[0, node_count)` for nodes,
    /// `[0, rack_count)` for racks.
    pub index: usize,
}

/// An unbounded, lazily evaluated stream of failure events.
#[derive(Debug)]
pub struct FailureEventScheduler {
    rng: StdRng,
    node_count: usize,
    rack_count: usize,
    node_mtbf: f64,
    rack_mtbf: f64,
    /// Absolute firing times of the next event of each class.
    next_node: f64,
    next_rack: f64,
    now: f64,
}

impl FailureEventScheduler {
    /// Create a scheduler for a cluster of `node_count` nodes in
    /// `rack_count` racks, with class-level mean times between failures in
    /// hours.
    #[must_use]
    pub fn new(
        node_count: usize,
        rack_count: usize,
        node_mtbf: f64,
        rack_mtbf: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let next_node = sample_exponential(&mut rng, node_mtbf);
        let next_rack = sample_exponential(&mut rng, rack_mtbf);
        Self { rng, node_count, rack_count, node_mtbf, rack_mtbf, next_node, next_rack, now: 0.0 }
    }
}

impl Iterator for FailureEventScheduler {
    type Item = FailureEvent;

    fn next(&mut self) -> Option<FailureEvent> {
        // Ties go to the node process; with continuous draws they do not
        // occur in practice.
        let (kind, time) = if self.next_node <= self.next_rack {
            (FailureKind::Node, self.next_node)
        } else {
            (FailureKind::Rack, self.next_rack)
        };

        let delta = time - self.now;
        self.now = time;

        let index = match kind {
            FailureKind::Node => {
                self.next_node = time + sample_exponential(&mut self.rng, self.node_mtbf);
                self.rng.gen_range(0..self.node_count)
            }
            FailureKind::Rack => {
                self.next_rack = time + sample_exponential(&mut self.rng, self.rack_mtbf);
                self.rng.gen_range(0..self.rack_count)
            }
        };

        Some(FailureEvent { delta, kind, index })
    }
}

/// Draw from an exponential distribution with the given mean.
///
/// The uniform draw is rejected at exactly zero so the result is strictly
/// positive.
pub(crate) fn sample_exponential(rng: &mut StdRng, mean: f64) -> f64 {
    let u = loop {
        let u: f64 = rng.gen();
        if u > 0.0 {
            break u;
        }
    };
    -mean * u.ln()
}
