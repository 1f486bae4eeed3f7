//! Static replica layout over a simulated topology.
//!
//! The simulator does not talk to a metadata repository; it lays replicas
//! out over a synthetic rack/node grid with the same placement queue the
//! production engine uses, so the simulated policy and the deployed policy
//! share their selection behavior. The layout is a pure function of the
//! experiment configuration, the placement parameters and the seed.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use fracstore_core::types::NodeId;
use fracstore_placement::{NodeUsage, PlacementQueue};

use crate::config::{ExperimentalConfiguration, PlacementParameters, PlacementStyle};

/// Where every replica of every sub-partition lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaLayout {
    /// Rack index of each node.
    pub node_rack: Vec<usize>,
    /// Replica home nodes per sub-partition, `replication_factor` entries
    /// each.
    pub replicas: Vec<Vec<usize>>,
}

impl ReplicaLayout {
    /// Total simulated node count.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_rack.len()
    }

    /// Nodes belonging to a rack.
    #[must_use]
    pub fn nodes_in_rack(&self, rack: usize) -> Vec<usize> {
        (0..self.node_rack.len()).filter(|&n| self.node_rack[n] == rack).collect()
    }
}

/// Lay replicas out over the simulated topology.
///
/// `Buddy` style packs all replicas of a sub-partition into one rack
/// (chosen least-loaded); `Spread` forces them onto distinct racks. The
/// seed permutes rack and node labels so equally-loaded candidates vary
/// between trials while the queue's selection logic stays untouched.
#[must_use]
pub fn decide_placement(
    config: &ExperimentalConfiguration,
    params: &PlacementParameters,
    seed: u64,
) -> ReplicaLayout {
    let racks = config.rack_count;
    let per_rack = config.nodes_per_rack;
    let nodes = racks * per_rack;
    assert!(racks > 0 && per_rack > 0, "simulated topology must have racks and nodes");
    assert!(params.replication_factor > 0, "replication factor must be positive");

    let mut rng = StdRng::seed_from_u64(seed);
    let mut rack_perm: Vec<usize> = (0..racks).collect();
    rack_perm.shuffle(&mut rng);
    let mut node_perms: Vec<Vec<usize>> = Vec::with_capacity(racks);
    for _ in 0..racks {
        let mut perm: Vec<usize> = (0..per_rack).collect();
        perm.shuffle(&mut rng);
        node_perms.push(perm);
    }

    // Logical slot -> physical node, preserving rack blocks.
    let physical = |slot: usize| -> usize {
        let rack = rack_perm[slot / per_rack];
        rack * per_rack + node_perms[rack][slot % per_rack]
    };

    let node_rack: Vec<usize> = (0..nodes).map(|n| n / per_rack).collect();
    let mut replicas = Vec::with_capacity(config.sub_partition_count);

    match params.style {
        PlacementStyle::Buddy => {
            let mut rack_queue = PlacementQueue::new(
                (0..racks).map(|r| NodeUsage::new(r as NodeId, 0)).collect(),
            );
            let mut node_queues: Vec<PlacementQueue> = (0..racks)
                .map(|_| {
                    PlacementQueue::new(
                        (0..per_rack).map(|s| NodeUsage::new(s as NodeId, 0)).collect(),
                    )
                })
                .collect();
            let empty = BTreeSet::new();

            for _ in 0..config.sub_partition_count {
                rack_queue.reset_for_partition(&empty);
                let rack_slot = rack_queue.pick_node() as usize;
                let queue = &mut node_queues[rack_slot];

                queue.reset_for_partition(&empty);
                let mut homes = Vec::with_capacity(params.replication_factor);
                for _ in 0..params.replication_factor {
                    if !params.buddy_exclusion {
                        // Duplicates on one node are allowed: clear the
                        // per-partition exclusion before every pick.
                        queue.reset_for_partition(&empty);
                    }
                    let slot = queue.pick_node() as usize;
                    homes.push(physical(rack_slot * per_rack + slot));
                }
                replicas.push(homes);
            }
        }
        PlacementStyle::Spread => {
            let mut queue = PlacementQueue::new(
                (0..nodes).map(|s| NodeUsage::new(s as NodeId, 0)).collect(),
            );

            for _ in 0..config.sub_partition_count {
                let mut excluded: BTreeSet<NodeId> = BTreeSet::new();
                let mut homes = Vec::with_capacity(params.replication_factor);
                for _ in 0..params.replication_factor {
                    queue.reset_for_partition(&excluded);
                    let slot = queue.pick_node() as usize;
                    // Exclude the whole rack block so the next replica goes
                    // to a different rack.
                    let rack_base = slot / per_rack * per_rack;
                    for s in rack_base..rack_base + per_rack {
                        excluded.insert(s as NodeId);
                    }
                    if params.buddy_exclusion {
                        excluded.insert(slot as NodeId);
                    }
                    homes.push(physical(slot));
                }
                replicas.push(homes);
            }
        }
    }

    ReplicaLayout { node_rack, replicas }
}
