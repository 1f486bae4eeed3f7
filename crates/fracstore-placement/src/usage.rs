//! Per-node bookkeeping for one placement pass.
//!
//! A pass assigns every sub-partition of one (fracture, group) pair, or
//! plans recovery for one lost rack/node. Usage values are owned by the pass
//! and discarded afterwards: the held-sub-partition sets are only meaningful
//! for the scheme currently being assigned, and carrying them into another
//! pass would silently break the duplicate-avoidance rule.

use std::collections::{BTreeMap, BTreeSet};

use fracstore_core::types::NodeId;

/// How many replica partitions one node stores, and which sub-partition
/// indices it already holds for the scheme pass in progress.
#[derive(Debug, Clone)]
pub struct NodeUsage {
    node: NodeId,
    count: u32,
    held: BTreeSet<usize>,
}

impl NodeUsage {
    /// Create usage for a node with its current assigned-partition count.
    #[must_use]
    pub fn new(node: NodeId, count: u32) -> Self {
        Self { node, count, held: BTreeSet::new() }
    }

    /// The node this usage tracks.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Current assigned-partition count.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record one more assigned partition.
    pub fn increment(&mut self) {
        self.count += 1;
    }

    /// Returns true if the node already holds the given sub-partition index
    /// in this pass.
    #[must_use]
    pub fn holds(&self, index: usize) -> bool {
        self.held.contains(&index)
    }

    /// Record that the node holds the given sub-partition index.
    pub fn mark_held(&mut self, index: usize) {
        self.held.insert(index);
    }
}

/// A collection of [`NodeUsage`] values keyed by node, built from the
/// repository's current per-node counts at the start of a pass.
#[derive(Debug, Default)]
pub struct NodeUsageTracker {
    nodes: BTreeMap<NodeId, NodeUsage>,
}

impl NodeUsageTracker {
    /// Build a tracker from `(node, current assigned count)` pairs.
    ///
    /// Arguments are assumed valid; the caller owns validation.
    #[must_use]
    pub fn from_counts(counts: impl IntoIterator<Item = (NodeId, u32)>) -> Self {
        let nodes = counts.into_iter().map(|(node, count)| (node, NodeUsage::new(node, count)));
        Self { nodes: nodes.collect() }
    }

    /// Record one more assigned partition on a node.
    pub fn increment(&mut self, node: NodeId) {
        if let Some(usage) = self.nodes.get_mut(&node) {
            usage.increment();
        }
    }

    /// Current assigned-partition count of a node. Unknown nodes count zero.
    #[must_use]
    pub fn count(&self, node: NodeId) -> u32 {
        self.nodes.get(&node).map_or(0, NodeUsage::count)
    }

    /// Record that a node holds a sub-partition index for the active scheme.
    pub fn mark_held(&mut self, node: NodeId, index: usize) {
        if let Some(usage) = self.nodes.get_mut(&node) {
            usage.mark_held(index);
        }
    }

    /// Nodes known to hold the given sub-partition index in this pass.
    #[must_use]
    pub fn holders(&self, index: usize) -> BTreeSet<NodeId> {
        self.nodes.values().filter(|u| u.holds(index)).map(NodeUsage::node).collect()
    }

    /// Consume the tracker, yielding its usage values in ascending node
    /// order. Feeds a [`crate::PlacementQueue`].
    #[must_use]
    pub fn into_usages(self) -> Vec<NodeUsage> {
        self.nodes.into_values().collect()
    }
}
