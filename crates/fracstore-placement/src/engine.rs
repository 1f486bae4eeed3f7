//! The placement engine: four topology-event handlers over the metadata
//! repository.
//!
//! Each event is processed to completion or fails atomically from the
//! caller's point of view: every repository create/update is its own atomic
//! unit, a failure aborts the handler without rolling back earlier
//! iterations, and re-running the same event is idempotent-safe because the
//! minimum-count group pick is stable.
//!
//! Rebalancing is greedy and movement-free by design: a committed rack
//! assignment is never revisited. When a rack joins, only groups that had no
//! rack at all are materialized immediately; everyone else exploits the new
//! capacity on the next fracture.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fracstore_core::types::{FractureId, GroupId, NodeId, PartitionId, RackId, SchemeId};
use fracstore_core::Result;
use fracstore_meta::entities::{NodeStatus, PartitionStatus, RackNode, RackStatus, ReplicaGroup};
use fracstore_meta::MetadataRepository;

use crate::queue::PlacementQueue;
use crate::usage::{NodeUsage, NodeUsageTracker};

/// A coarse cluster-topology event delivered by the cluster-management layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyEvent {
    /// A rack was added to the cluster.
    RackAdded(RackId),
    /// A fracture finished ingestion and needs replicas.
    FractureAdded(FractureId),
    /// A rack was lost.
    RackLost(RackId),
    /// A single node was lost.
    NodeLost(NodeId),
}

/// One recovery decision: re-create a replica partition on a new node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAction {
    /// The partition to recover.
    pub partition: PartitionId,
    /// Fracture the partition belongs to.
    pub fracture: FractureId,
    /// Replica scheme the partition belongs to.
    pub scheme: SchemeId,
    /// Sub-partition index.
    pub index: usize,
    /// The lost node the partition resided on.
    pub from: NodeId,
    /// The chosen destination node.
    pub to: NodeId,
}

/// The engine's output for a loss event: which partitions go where.
///
/// Scheduling and executing the byte transfers is the column-storage
/// layer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPlan {
    /// Planned recoveries, in partition-id order per lost node.
    pub actions: Vec<RecoveryAction>,
}

impl RecoveryPlan {
    /// Number of planned recoveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if nothing needs recovering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Reacts to topology events by creating rack assignments and replica
/// partitions through the injected [`MetadataRepository`].
pub struct PlacementEngine {
    repo: Arc<dyn MetadataRepository>,
}

impl PlacementEngine {
    /// Create an engine over the given repository.
    #[must_use]
    pub fn new(repo: Arc<dyn MetadataRepository>) -> Self {
        Self { repo }
    }

    /// Dispatch a topology event to its handler.
    ///
    /// Add events return an empty plan; loss events return the recovery
    /// destinations they chose.
    pub fn handle(&self, event: TopologyEvent) -> Result<RecoveryPlan> {
        match event {
            TopologyEvent::RackAdded(rack) => {
                self.on_new_rack(rack)?;
                Ok(RecoveryPlan::default())
            }
            TopologyEvent::FractureAdded(fracture) => {
                self.on_new_fracture(fracture)?;
                Ok(RecoveryPlan::default())
            }
            TopologyEvent::RackLost(rack) => self.on_lost_rack(rack),
            TopologyEvent::NodeLost(node) => self.on_lost_rack_node(node),
        }
    }

    /// A rack joined: give it to the least-assigned replica group of every
    /// active fracture.
    /// Groups that had no rack at all are materialized immediately; for the
    /// rest the new capacity is exploited on the next fracture, so existing
    /// replicas never move.
    pub fn on_new_rack(&self, rack_id: RackId) -> Result<()> {
        let rack = self.repo.rack(rack_id)?;
        info!(rack = rack.id, name = %rack.name, "assigning new rack to replica groups");

        for table in self.repo.all_tables()? {
            let groups = self.repo.replica_groups(table.id)?;
            if groups.is_empty() {
                warn!(table = table.id, "table has no replica groups; nothing to place against");
                continue;
            }
            for fracture in self.repo.fractures(table.id)? {
                if !fracture.is_active() {
                    continue;
                }
                let counts = self.group_rack_counts(&groups, fracture.id)?;
                let (group, prior) = min_count_group(&counts);
                self.repo.create_rack_assignment(rack.id, fracture.id, group)?;
                counter!("fracstore_placement_rack_assignments_total").increment(1);

                if prior == 0 {
                    // First rack the group ever got: its replicas do not
                    // exist yet, so place them now.
                    self.materialize(fracture.id, group)?;
                } else {
                    debug!(
                        rack = rack.id,
                        fracture = fracture.id,
                        group,
                        "capacity recorded; existing replicas stay until the next fracture"
                    );
                }
            }
        }
        Ok(())
    }

    /// A fracture finished ingestion: assign every live rack to its
    /// least-assigned group, then place all replica partitions of every
    /// group that received at least one rack.
    pub fn on_new_fracture(&self, fracture_id: FractureId) -> Result<()> {
        let fracture = self.repo.fracture(fracture_id)?;
        info!(fracture = fracture.id, table = fracture.table, "placing replicas for new fracture");

        let groups = self.repo.replica_groups(fracture.table)?;
        if groups.is_empty() {
            warn!(
                fracture = fracture.id,
                table = fracture.table,
                "table has no replica groups; fracture gets no replicas"
            );
            return Ok(());
        }

        let mut counts = self.group_rack_counts(&groups, fracture.id)?;
        let mut touched = BTreeSet::new();
        for rack in self.repo.all_racks()? {
            if !rack.is_ok() {
                continue;
            }
            let (group, _) = min_count_group(&counts);
            self.repo.create_rack_assignment(rack.id, fracture.id, group)?;
            counter!("fracstore_placement_rack_assignments_total").increment(1);
            if let Some(count) = counts.get_mut(&group) {
                *count += 1;
            }
            touched.insert(group);
        }

        if touched.is_empty() {
            warn!(fracture = fracture.id, "no live racks; the fracture is not replicated yet");
        }
        for group in touched {
            self.materialize(fracture.id, group)?;
        }
        Ok(())
    }

    /// A rack was lost: mark it and its nodes lost, then pick a recovery
    /// destination on the surviving racks for every partition it hosted.
    pub fn on_lost_rack(&self, rack_id: RackId) -> Result<RecoveryPlan> {
        let rack = self.repo.rack(rack_id)?;
        warn!(rack = rack.id, name = %rack.name, "rack lost; planning recovery");
        self.repo.update_rack_status(rack.id, RackStatus::Lost)?;

        let mut lost_nodes = Vec::new();
        for node in self.repo.rack_nodes(rack.id)? {
            self.repo.update_node_status(node.id, NodeStatus::Lost)?;
            lost_nodes.push(node);
        }
        self.plan_recovery(&lost_nodes)
    }

    /// A single node was lost: mark it lost and pick recovery destinations,
    /// preferring its own rack, then racks assigned to the same group, then
    /// anywhere live. The ordering minimizes cross-rack transfer first and
    /// intra-group locality second.
    pub fn on_lost_rack_node(&self, node_id: NodeId) -> Result<RecoveryPlan> {
        let node = self.repo.rack_node(node_id)?;
        warn!(node = node.id, rack = node.rack, "node lost; planning recovery");
        self.repo.update_node_status(node.id, NodeStatus::Lost)?;
        self.plan_recovery(&[node])
    }

    /// Rack-assignment counts per group of one fracture. Assignments whose
    /// group is no longer known are skipped with a warning; stale metadata
    /// must not wedge the whole event.
    fn group_rack_counts(
        &self,
        groups: &[ReplicaGroup],
        fracture: FractureId,
    ) -> Result<BTreeMap<GroupId, usize>> {
        let mut counts: BTreeMap<GroupId, usize> = groups.iter().map(|g| (g.id, 0)).collect();
        for assignment in self.repo.rack_assignments_by_fracture(fracture)? {
            match counts.get_mut(&assignment.group) {
                Some(count) => *count += 1,
                None => warn!(
                    assignment = assignment.id,
                    group = assignment.group,
                    "rack assignment references an unknown replica group; skipping"
                ),
            }
        }
        Ok(counts)
    }

    /// Place every missing replica partition of `(fracture, group)` on the
    /// live nodes of the racks assigned to the group.
    ///
    /// One call is one assignment pass: the queue and its usage values are
    /// built here and dropped here, never shared with another pass.
    fn materialize(&self, fracture: FractureId, group: GroupId) -> Result<()> {
        let assignments = self.repo.rack_assignments_by_fracture(fracture)?;
        let mut nodes: BTreeMap<NodeId, RackNode> = BTreeMap::new();
        for assignment in assignments.iter().filter(|a| a.group == group) {
            let rack = self.repo.rack(assignment.rack)?;
            if !rack.is_ok() {
                continue;
            }
            for node in self.repo.rack_nodes(rack.id)? {
                if node.is_ok() {
                    nodes.insert(node.id, node);
                }
            }
        }
        if nodes.is_empty() {
            warn!(fracture, group, "no live node in the group's racks; nothing to place");
            return Ok(());
        }

        let sub_scheme = self.repo.sub_partition_scheme(fracture, group)?;
        let schemes = self.repo.replica_schemes(group)?;

        let mut counts = Vec::with_capacity(nodes.len());
        for node in nodes.keys() {
            counts.push((*node, self.repo.node_partition_count(*node)?));
        }
        let tracker = NodeUsageTracker::from_counts(counts);
        let mut queue = PlacementQueue::new(tracker.into_usages());

        // Partitions that already exist (an earlier run of this event may
        // have been cut short) stay put; their nodes become holders.
        let mut existing: BTreeMap<SchemeId, BTreeSet<usize>> = BTreeMap::new();
        for scheme in &schemes {
            for part in self.repo.replica_partitions_by_scheme(scheme.id)? {
                if part.fracture != fracture {
                    continue;
                }
                existing.entry(scheme.id).or_default().insert(part.index);
                queue.mark_held(part.node, part.index);
            }
        }

        let mut created = 0u64;
        for scheme in &schemes {
            let done = existing.get(&scheme.id);
            for index in 0..sub_scheme.partition_count() {
                if done.is_some_and(|d| d.contains(&index)) {
                    continue;
                }
                let holders = queue.holders(index);
                queue.reset_for_partition(&holders);
                let node = queue.pick_node();
                self.repo.create_replica_partition(fracture, scheme.id, index, node)?;
                queue.mark_held(node, index);
                created += 1;
            }
        }
        counter!("fracstore_placement_partitions_created_total").increment(created);
        debug!(fracture, group, partitions = created, "materialized replica partitions");
        Ok(())
    }

    /// Choose a recovery destination for every partition hosted on the lost
    /// nodes. Candidate tiers, cheapest transfer first:
    /// live nodes of the same rack, then live nodes of other racks assigned
    /// to the same group, then any live node. A tier whose nodes all hold
    /// the sub-partition already is skipped before violating the duplicate
    /// rule; if every live node holds it, the queue's least-loaded fallback
    /// applies.
    fn plan_recovery(&self, lost_nodes: &[RackNode]) -> Result<RecoveryPlan> {
        let mut live_nodes: BTreeMap<NodeId, RackNode> = BTreeMap::new();
        for rack in self.repo.all_racks()? {
            if !rack.is_ok() {
                continue;
            }
            for node in self.repo.rack_nodes(rack.id)? {
                if node.is_ok() {
                    live_nodes.insert(node.id, node);
                }
            }
        }

        // One shared tracker across the plan, so successive recoveries keep
        // spreading load instead of piling onto one node.
        let mut counts = Vec::with_capacity(live_nodes.len());
        for node in live_nodes.keys() {
            counts.push((*node, self.repo.node_partition_count(*node)?));
        }
        let mut tracker = NodeUsageTracker::from_counts(counts);

        let mut actions = Vec::new();
        for lost in lost_nodes {
            for part in self.repo.replica_partitions_on_node(lost.id)? {
                if part.status == PartitionStatus::Lost {
                    continue;
                }
                let scheme = match self.repo.replica_scheme(part.scheme) {
                    Ok(scheme) => scheme,
                    Err(err) if err.is_not_found() => {
                        warn!(
                            partition = part.id,
                            scheme = part.scheme,
                            "partition references an unknown replica scheme; skipping"
                        );
                        continue;
                    }
                    Err(err) => return Err(err),
                };

                // Surviving holders of this sub-partition, any scheme of
                // the group.
                let mut holders = BTreeSet::new();
                for sibling in self.repo.replica_schemes(scheme.group)? {
                    for p in self.repo.replica_partitions_by_scheme(sibling.id)? {
                        if p.fracture == part.fracture
                            && p.index == part.index
                            && live_nodes.contains_key(&p.node)
                        {
                            holders.insert(p.node);
                        }
                    }
                }

                let assigned_racks: BTreeSet<RackId> = self
                    .repo
                    .rack_assignments_by_fracture(part.fracture)?
                    .iter()
                    .filter(|a| a.group == scheme.group)
                    .map(|a| a.rack)
                    .collect();

                let same_rack: Vec<NodeId> = live_nodes
                    .values()
                    .filter(|n| n.rack == lost.rack)
                    .map(|n| n.id)
                    .collect();
                let same_group: Vec<NodeId> = live_nodes
                    .values()
                    .filter(|n| n.rack != lost.rack && assigned_racks.contains(&n.rack))
                    .map(|n| n.id)
                    .collect();
                let elsewhere: Vec<NodeId> = live_nodes
                    .values()
                    .filter(|n| n.rack != lost.rack && !assigned_racks.contains(&n.rack))
                    .map(|n| n.id)
                    .collect();

                let tiers = [same_rack, same_group, elsewhere];
                let candidates = tiers
                    .iter()
                    .find(|tier| tier.iter().any(|n| !holders.contains(n)))
                    .or_else(|| tiers.iter().find(|tier| !tier.is_empty()));
                let Some(candidates) = candidates else {
                    warn!(partition = part.id, "no live node can host this partition; marking it lost");
                    self.repo.reassign_replica_partition(part.id, part.node, PartitionStatus::Lost)?;
                    continue;
                };

                let usages: Vec<NodeUsage> =
                    candidates.iter().map(|&n| NodeUsage::new(n, tracker.count(n))).collect();
                let mut queue = PlacementQueue::new(usages);
                queue.reset_for_partition(&holders);
                let dest = queue.pick_node();
                tracker.increment(dest);

                self.repo.reassign_replica_partition(
                    part.id,
                    dest,
                    PartitionStatus::BeingRecovered,
                )?;
                counter!("fracstore_recovery_actions_total").increment(1);
                actions.push(RecoveryAction {
                    partition: part.id,
                    fracture: part.fracture,
                    scheme: part.scheme,
                    index: part.index,
                    from: lost.id,
                    to: dest,
                });
            }
        }

        info!(actions = actions.len(), "recovery plan ready");
        Ok(RecoveryPlan { actions })
    }
}

/// The group with the fewest rack assignments; ties go to the lowest group
/// id (the map iterates ascending and only a strictly smaller count wins).
fn min_count_group(counts: &BTreeMap<GroupId, usize>) -> (GroupId, usize) {
    let mut best: Option<(GroupId, usize)> = None;
    for (&group, &count) in counts {
        match best {
            Some((_, min)) if count >= min => {}
            _ => best = Some((group, count)),
        }
    }
    best.unwrap_or((0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_count_tie_goes_to_lowest_group_id() {
        let counts = BTreeMap::from([(5, 2), (2, 1), (9, 1)]);
        assert_eq!(min_count_group(&counts), (2, 1));
    }

    #[test]
    fn test_min_count_prefers_smaller_count() {
        let counts = BTreeMap::from([(1, 3), (2, 0), (3, 1)]);
        assert_eq!(min_count_group(&counts), (2, 0));
    }
}
