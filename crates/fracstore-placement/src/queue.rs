//! Least-loaded node selection under the duplicate-avoidance rule.
//!
//! The queue keeps nodes ordered ascending by `(assigned count, node id)`
//! and answers "which node receives the next replica partition". Before the
//! picks for each sub-partition, [`PlacementQueue::reset_for_partition`]
//! loads the exclusion set: the nodes that already store some replica of
//! that sub-partition, under any replica scheme. A pick skips excluded
//! nodes; when every node is excluded it falls back to the globally
//! least-loaded one, because the replication factor may exceed the number of
//! disjoint nodes and forward progress wins over the soft constraint.

use std::collections::BTreeSet;

use metrics::counter;
use tracing::debug;

use fracstore_core::types::NodeId;

use crate::usage::NodeUsage;

/// A priority queue of nodes ordered ascending by assigned-partition count,
/// ties broken by ascending node id.
#[derive(Debug)]
pub struct PlacementQueue {
    /// Sorted ascending by `(count, node)`.
    entries: Vec<NodeUsage>,
    /// Per-partition exclusion set; reloaded by `reset_for_partition`.
    excluded: BTreeSet<NodeId>,
}

impl PlacementQueue {
    /// Build a queue from the usage values of one placement pass.
    ///
    /// # Panics
    ///
    /// Panics if `usages` is empty. An empty candidate set is a caller bug,
    /// never a runtime condition to paper over.
    #[must_use]
    pub fn new(mut usages: Vec<NodeUsage>) -> Self {
        assert!(!usages.is_empty(), "placement queue requires at least one candidate node");
        usages.sort_by_key(|u| (u.count(), u.node()));
        Self { entries: usages, excluded: BTreeSet::new() }
    }

    /// Load the exclusion set for the sub-partition about to be placed.
    ///
    /// Must be called once per sub-partition, before any
    /// [`PlacementQueue::pick_node`] calls for it.
    pub fn reset_for_partition(&mut self, excluded: &BTreeSet<NodeId>) {
        self.excluded.clear();
        self.excluded.extend(excluded.iter().copied());
    }

    /// Pick the least-loaded node not in the exclusion set, then account for
    /// the new partition on it.
    ///
    /// Falls back to the globally least-loaded node when every node is
    /// excluded; the violation is expected and logged, not an error.
    pub fn pick_node(&mut self) -> NodeId {
        let idx = match self.entries.iter().position(|u| !self.excluded.contains(&u.node())) {
            Some(idx) => idx,
            None => {
                debug!(
                    nodes = self.entries.len(),
                    "every candidate already holds this sub-partition; placing on the least-loaded node"
                );
                counter!("fracstore_placement_fallback_picks_total").increment(1);
                0
            }
        };

        let node = self.entries[idx].node();
        self.entries[idx].increment();
        self.excluded.insert(node);
        self.restore_order(idx);
        node
    }

    /// Record that a node holds a sub-partition index in this pass.
    pub fn mark_held(&mut self, node: NodeId, index: usize) {
        if let Some(usage) = self.entries.iter_mut().find(|u| u.node() == node) {
            usage.mark_held(index);
        }
    }

    /// Nodes holding the given sub-partition index in this pass.
    #[must_use]
    pub fn holders(&self, index: usize) -> BTreeSet<NodeId> {
        self.entries.iter().filter(|u| u.holds(index)).map(NodeUsage::node).collect()
    }

    /// Current entries, in queue order. Exposed for invariant checks.
    #[must_use]
    pub fn entries(&self) -> &[NodeUsage] {
        &self.entries
    }

    /// Relocate the entry at `idx` rightwards until the `(count, node)`
    /// ordering holds again. A pick increments exactly one count, so a
    /// single-element shift suffices; no full re-sort.
    fn restore_order(&mut self, mut idx: usize) {
        while idx + 1 < self.entries.len() {
            let here = (self.entries[idx].count(), self.entries[idx].node());
            let next = (self.entries[idx + 1].count(), self.entries[idx + 1].node());
            if next < here {
                self.entries.swap(idx, idx + 1);
                idx += 1;
            } else {
                break;
            }
        }
    }
}
