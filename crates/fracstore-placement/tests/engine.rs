//! Integration tests for the placement engine against the in-memory
//! metadata repository.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fracstore_core::types::{FractureId, GroupId, NodeId, RackId, TableId};
use fracstore_meta::entities::{PartitionStatus, RackStatus};
use fracstore_meta::{MemoryRepository, MetadataRepository};
use fracstore_placement::{PlacementEngine, TopologyEvent};

struct Cluster {
    repo: Arc<MemoryRepository>,
    engine: PlacementEngine,
    table: TableId,
}

impl Cluster {
    fn new() -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let engine = PlacementEngine::new(repo.clone());
        let table = repo.create_table("events").id;
        Self { repo, engine, table }
    }

    fn add_group(&self, schemes: usize) -> GroupId {
        let group = self.repo.create_replica_group(self.table, (0, 9999)).unwrap();
        for i in 0..schemes {
            self.repo.create_replica_scheme(group.id, format!("col{i}")).unwrap();
        }
        group.id
    }

    fn add_rack(&self, nodes: usize) -> (RackId, Vec<NodeId>) {
        let rack = self.repo.create_rack(format!("rack-{}", self.repo.assignment_count()));
        let nodes = (0..nodes)
            .map(|i| self.repo.create_rack_node(rack.id, format!("n{i}")).unwrap().id)
            .collect();
        (rack.id, nodes)
    }

    fn add_fracture(&self, groups: &[GroupId], indices: usize) -> FractureId {
        let fracture = self.repo.create_fracture(self.table, (0, 3600), 10_000).unwrap();
        let width = 10_000 / indices as i64;
        let ranges: Vec<(i64, i64)> =
            (0..indices as i64).map(|i| (i * width, (i + 1) * width - 1)).collect();
        for &group in groups {
            self.repo.create_sub_partition_scheme(fracture.id, group, ranges.clone()).unwrap();
        }
        fracture.id
    }

    /// (group, sub-partition index) -> nodes hosting a replica of it.
    fn holders(&self, groups: &[GroupId]) -> BTreeMap<(GroupId, usize), Vec<NodeId>> {
        let mut map: BTreeMap<(GroupId, usize), Vec<NodeId>> = BTreeMap::new();
        for &group in groups {
            for scheme in self.repo.replica_schemes(group).unwrap() {
                for part in self.repo.replica_partitions_by_scheme(scheme.id).unwrap() {
                    map.entry((group, part.index)).or_default().push(part.node);
                }
            }
        }
        map
    }
}

#[test]
fn test_new_fracture_places_every_scheme_and_index() {
    let cluster = Cluster::new();
    let group_a = cluster.add_group(2);
    let group_b = cluster.add_group(2);
    cluster.add_rack(2);
    cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group_a, group_b], 4);

    cluster.engine.on_new_fracture(fracture).unwrap();

    // Two racks, two groups: the balance rule gives each group one rack.
    let assignments = cluster.repo.rack_assignments_by_fracture(fracture).unwrap();
    assert_eq!(assignments.len(), 2);
    let groups_assigned: BTreeSet<GroupId> = assignments.iter().map(|a| a.group).collect();
    assert_eq!(groups_assigned, BTreeSet::from([group_a, group_b]));

    // Every (scheme, index) pair is materialized: 2 schemes x 4 indices per group.
    let holders = cluster.holders(&[group_a, group_b]);
    for group in [group_a, group_b] {
        for index in 0..4 {
            let nodes = &holders[&(group, index)];
            assert_eq!(nodes.len(), 2, "group {group} index {index}");
            // Replicas of the same sub-partition land on distinct nodes.
            let distinct: BTreeSet<NodeId> = nodes.iter().copied().collect();
            assert_eq!(distinct.len(), 2, "group {group} index {index} doubled up");
        }
    }
}

#[test]
fn test_partitions_balance_across_nodes() {
    let cluster = Cluster::new();
    let group = cluster.add_group(2);
    let (_, nodes) = cluster.add_rack(4);
    let fracture = cluster.add_fracture(&[group], 6);

    cluster.engine.on_new_fracture(fracture).unwrap();

    // 2 schemes x 6 indices = 12 partitions over 4 nodes: 3 each.
    for node in nodes {
        assert_eq!(cluster.repo.node_partition_count(node).unwrap(), 3);
    }
}

#[test]
fn test_duplicate_rule_falls_back_when_nodes_run_out() {
    let cluster = Cluster::new();
    let group = cluster.add_group(3);
    let (_, nodes) = cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group], 1);

    cluster.engine.on_new_fracture(fracture).unwrap();

    // Three replicas of one sub-partition over two nodes: the constraint is
    // violated exactly once, on the least-loaded node.
    let holders = cluster.holders(&[group]);
    let mut counts: BTreeMap<NodeId, usize> = BTreeMap::new();
    for node in &holders[&(group, 0)] {
        *counts.entry(*node).or_default() += 1;
    }
    assert_eq!(counts[&nodes[0]], 2);
    assert_eq!(counts[&nodes[1]], 1);
}

#[test]
fn test_new_rack_materializes_only_rackless_groups() {
    let cluster = Cluster::new();
    let group = cluster.add_group(2);
    let (rack_a, _) = cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group], 3);

    cluster.engine.on_new_rack(rack_a).unwrap();

    // The group had no racks, so the new rack is exploited immediately.
    let assignments = cluster.repo.rack_assignments_by_fracture(fracture).unwrap();
    assert_eq!(assignments.len(), 1);
    let placed: usize = cluster.holders(&[group]).values().map(Vec::len).sum();
    assert_eq!(placed, 6);

    // A second rack only records capacity; existing replicas stay put.
    let (rack_b, _) = cluster.add_rack(2);
    cluster.engine.on_new_rack(rack_b).unwrap();

    let assignments = cluster.repo.rack_assignments_by_fracture(fracture).unwrap();
    assert_eq!(assignments.len(), 2);
    let placed_after: usize = cluster.holders(&[group]).values().map(Vec::len).sum();
    assert_eq!(placed_after, placed, "deferred rack must not move replicas");
}

#[test]
fn test_rack_growth_balance_is_order_independent() {
    let outcome = |order: &[usize]| -> BTreeMap<GroupId, usize> {
        let cluster = Cluster::new();
        let groups = [cluster.add_group(1), cluster.add_group(1), cluster.add_group(1)];
        let fracture = cluster.add_fracture(&groups, 2);
        let racks: Vec<RackId> = (0..3).map(|_| cluster.add_rack(1).0).collect();

        for &i in order {
            cluster.engine.on_new_rack(racks[i]).unwrap();
        }

        let mut counts: BTreeMap<GroupId, usize> = groups.iter().map(|&g| (g, 0)).collect();
        for a in cluster.repo.rack_assignments_by_fracture(fracture).unwrap() {
            *counts.get_mut(&a.group).unwrap() += 1;
        }
        counts
    };

    let forward = outcome(&[0, 1, 2]);
    let backward = outcome(&[2, 1, 0]);

    // The specific rack-to-group mapping may differ; the balance may not.
    let forward_counts: Vec<usize> = forward.values().copied().collect();
    let backward_counts: Vec<usize> = backward.values().copied().collect();
    assert_eq!(forward_counts, vec![1, 1, 1]);
    assert_eq!(forward_counts, backward_counts);
}

#[test]
fn test_node_loss_recovers_into_same_rack_first() {
    let cluster = Cluster::new();
    let group = cluster.add_group(1);
    let (rack_a, nodes_a) = cluster.add_rack(3);
    let (_rack_b, _nodes_b) = cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group], 2);
    cluster.engine.on_new_fracture(fracture).unwrap();

    // Index 0 landed on the lowest-id node of rack A.
    let lost = nodes_a[0];
    let plan = cluster.engine.on_lost_rack_node(lost).unwrap();

    assert_eq!(plan.len(), 1);
    let action = &plan.actions[0];
    assert_eq!(action.from, lost);
    let dest = cluster.repo.rack_node(action.to).unwrap();
    assert_eq!(dest.rack, rack_a, "same-rack candidates must win");
    assert_ne!(action.to, lost);

    // The repository records the destination and the in-flight status.
    let part = cluster.repo.replica_partition(action.partition).unwrap();
    assert_eq!(part.node, action.to);
    assert_eq!(part.status, PartitionStatus::BeingRecovered);
}

#[test]
fn test_recovery_prefers_racks_assigned_to_the_group() {
    let cluster = Cluster::new();
    let group = cluster.add_group(1);
    let (_rack_a, nodes_a) = cluster.add_rack(1);
    let (rack_b, _) = cluster.add_rack(1);
    let fracture = cluster.add_fracture(&[group], 1);
    cluster.engine.on_new_fracture(fracture).unwrap();

    // Present and live, but never assigned to the group.
    cluster.add_rack(1);

    // Rack A held the only replica and has no other node, so the choice is
    // between rack B (assigned) and the unassigned rack.
    let plan = cluster.engine.on_lost_rack_node(nodes_a[0]).unwrap();

    assert_eq!(plan.len(), 1);
    let dest = cluster.repo.rack_node(plan.actions[0].to).unwrap();
    assert_eq!(dest.rack, rack_b, "a rack assigned to the group beats an unassigned one");
}

#[test]
fn test_recovery_skips_tier_whose_nodes_hold_the_partition() {
    let cluster = Cluster::new();
    let group = cluster.add_group(2);
    let (_rack_a, nodes_a) = cluster.add_rack(1);
    cluster.add_rack(1);
    let fracture = cluster.add_fracture(&[group], 1);
    cluster.engine.on_new_fracture(fracture).unwrap();

    let (rack_c, nodes_c) = cluster.add_rack(1);

    // Both replicas of index 0 landed on the two assigned single-node
    // racks. After losing the first, the only same-group candidate already
    // holds the sub-partition, so that whole tier is skipped instead of
    // doubling up.
    let plan = cluster.engine.on_lost_rack_node(nodes_a[0]).unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.actions[0].to, nodes_c[0]);
    let dest = cluster.repo.rack_node(plan.actions[0].to).unwrap();
    assert_eq!(dest.rack, rack_c, "duplicate rule falls through to the unassigned rack");

    let part = cluster.repo.replica_partition(plan.actions[0].partition).unwrap();
    assert_eq!(part.status, PartitionStatus::BeingRecovered);
}

#[test]
fn test_rack_loss_recovers_onto_surviving_racks() {
    let cluster = Cluster::new();
    let group = cluster.add_group(1);
    let (rack_a, _) = cluster.add_rack(2);
    let (rack_b, nodes_b) = cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group], 2);
    cluster.engine.on_new_fracture(fracture).unwrap();

    let plan = cluster.engine.on_lost_rack(rack_a).unwrap();

    // Both partitions lived on rack A (least-loaded ascending ids) and must
    // move to rack B, spread across its nodes.
    assert_eq!(plan.len(), 2);
    let dests: BTreeSet<NodeId> = plan.actions.iter().map(|a| a.to).collect();
    assert_eq!(dests, nodes_b.iter().copied().collect());

    assert_eq!(cluster.repo.rack(rack_a).unwrap().status, RackStatus::Lost);
    for node in cluster.repo.rack_nodes(rack_a).unwrap() {
        assert!(!node.is_ok());
    }
}

#[test]
fn test_assignments_are_append_only() {
    let cluster = Cluster::new();
    let group = cluster.add_group(1);
    let (rack_a, _) = cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group], 2);

    cluster.engine.on_new_fracture(fracture).unwrap();
    let after_fracture = cluster.repo.assignment_count();

    let (rack_b, _) = cluster.add_rack(2);
    cluster.engine.on_new_rack(rack_b).unwrap();
    let after_rack = cluster.repo.assignment_count();
    assert!(after_rack >= after_fracture);

    cluster.engine.on_lost_rack(rack_a).unwrap();
    assert_eq!(cluster.repo.assignment_count(), after_rack, "loss events never drop assignments");
}

#[test]
fn test_event_dispatch() {
    let cluster = Cluster::new();
    let group = cluster.add_group(1);
    let (rack_a, _) = cluster.add_rack(2);
    cluster.add_rack(2);
    let fracture = cluster.add_fracture(&[group], 2);

    let plan = cluster.engine.handle(TopologyEvent::FractureAdded(fracture)).unwrap();
    assert!(plan.is_empty());

    // Both partitions landed on the first rack's nodes; losing that rack
    // yields one recovery per partition.
    let plan = cluster.engine.handle(TopologyEvent::RackLost(rack_a)).unwrap();
    assert_eq!(plan.len(), 2);
}

#[test]
fn test_table_without_groups_is_skipped() {
    let cluster = Cluster::new();
    let (rack, _) = cluster.add_rack(1);

    // No groups anywhere: the event succeeds and records nothing.
    cluster.engine.on_new_rack(rack).unwrap();
    assert_eq!(cluster.repo.assignment_count(), 0);
}

#[test]
fn test_missing_fracture_aborts_event() {
    let cluster = Cluster::new();
    let err = cluster.engine.on_new_fracture(9999).unwrap_err();
    assert!(err.is_not_found());
}
