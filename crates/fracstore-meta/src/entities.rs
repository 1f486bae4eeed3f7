//! Value types for the fracstore metadata model.
//!
//! Tables are fractured into immutable, time-windowed slices. Each fracture's
//! tuples are divided by a replica group into contiguous key ranges
//! (sub-partitions); each group owns one replica scheme per physical
//! replication strategy. Rack assignments record which racks may host a
//! (fracture, group) pair, and replica partitions are the physical
//! (scheme, sub-partition, node) instances the placement engine assigns.

use serde::{Deserialize, Serialize};

use fracstore_core::types::{
    AssignmentId, FractureId, GroupId, NodeId, PartitionId, RackId, SchemeId, TableId,
};

/// Status of a rack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RackStatus {
    /// Rack is healthy and hosting replicas.
    #[default]
    Ok,
    /// Rack has been lost (power, network, decommission).
    Lost,
}

/// Status of a node within a rack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Node is healthy and hosting replicas.
    #[default]
    Ok,
    /// Node has been lost.
    Lost,
}

/// Status of a fracture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FractureStatus {
    /// Fracture holds live data.
    #[default]
    Active,
    /// Fracture has been dropped (retention expiry).
    Dropped,
}

/// Status of a replica partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionStatus {
    /// Partition bytes are in place and queryable.
    #[default]
    Ok,
    /// Partition has a recovery destination assigned; bytes are in flight.
    BeingRecovered,
    /// Partition bytes are gone and no recovery source exists.
    Lost,
}

/// A table in the column store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Unique table id.
    pub id: TableId,
    /// Human-readable name.
    pub name: String,
}

/// A physical rack of nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rack {
    /// Unique rack id.
    pub id: RackId,
    /// Human-readable name.
    pub name: String,
    /// Current status.
    pub status: RackStatus,
}

impl Rack {
    /// Create a new healthy rack.
    #[must_use]
    pub fn new(id: RackId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), status: RackStatus::Ok }
    }

    /// Set the rack status.
    #[must_use]
    pub fn with_status(mut self, status: RackStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true if the rack can host new replicas.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == RackStatus::Ok
    }
}

/// A node within a rack.
///
/// The rack reference is non-owning; the rack record is the authority for
/// rack-level status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackNode {
    /// Unique node id.
    pub id: NodeId,
    /// Owning rack.
    pub rack: RackId,
    /// Human-readable name.
    pub name: String,
    /// Current status.
    pub status: NodeStatus,
}

impl RackNode {
    /// Create a new healthy node.
    #[must_use]
    pub fn new(id: NodeId, rack: RackId, name: impl Into<String>) -> Self {
        Self { id, rack, name: name.into(), status: NodeStatus::Ok }
    }

    /// Set the node status.
    #[must_use]
    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true if the node can host new replicas.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == NodeStatus::Ok
    }
}

/// A replica group: a partitioning scheme dividing a table's tuples into
/// contiguous key ranges, replicated as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaGroup {
    /// Unique group id.
    pub id: GroupId,
    /// Owning table.
    pub table: TableId,
    /// The group's overall key domain, sliced by each fracture's
    /// sub-partition scheme.
    pub key_range: (i64, i64),
}

/// One concrete physical replication strategy within a replica group.
///
/// Every scheme of a group holds a full copy of the group's data, so the
/// number of schemes is the group's replication factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaScheme {
    /// Unique scheme id.
    pub id: SchemeId,
    /// Owning replica group.
    pub group: GroupId,
    /// Column the scheme's tuples are sorted by.
    pub sort_column: String,
}

/// An immutable, time-bounded slice of a table's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fracture {
    /// Unique fracture id.
    pub id: FractureId,
    /// Owning table.
    pub table: TableId,
    /// Inclusive time window covered by this fracture (epoch seconds).
    pub window: (i64, i64),
    /// Number of tuples in the fracture.
    pub tuple_count: u64,
    /// Current status. The only mutable field after creation.
    pub status: FractureStatus,
}

impl Fracture {
    /// Returns true if the fracture holds live data.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == FractureStatus::Active
    }
}

/// A record that a rack may host replicas of a (fracture, group) pair.
///
/// Assignments are append-only: rebalancing never deletes or moves a
/// committed assignment, it only exploits new capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RackAssignment {
    /// Unique assignment id.
    pub id: AssignmentId,
    /// Assigned rack.
    pub rack: RackId,
    /// Fracture the assignment applies to.
    pub fracture: FractureId,
    /// Replica group the rack may host.
    pub group: GroupId,
}

/// The ordered key ranges a (fracture, group) pair is divided into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubPartitionScheme {
    /// Fracture this scheme partitions.
    pub fracture: FractureId,
    /// Replica group this scheme partitions.
    pub group: GroupId,
    /// Contiguous key ranges, in ascending order. The index into this vector
    /// is the sub-partition index.
    pub ranges: Vec<(i64, i64)>,
}

impl SubPartitionScheme {
    /// Number of sub-partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.ranges.len()
    }
}

/// A physical replica partition: one sub-partition of one replica scheme,
/// stored on one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaPartition {
    /// Unique partition id.
    pub id: PartitionId,
    /// Fracture the partition belongs to.
    pub fracture: FractureId,
    /// Replica scheme the partition belongs to.
    pub scheme: SchemeId,
    /// Sub-partition index within the fracture's sub-partition scheme.
    pub index: usize,
    /// Node currently hosting (or receiving) the partition.
    pub node: NodeId,
    /// Current status.
    pub status: PartitionStatus,
}

impl ReplicaPartition {
    /// Returns true if the partition's bytes are in place and queryable.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == PartitionStatus::Ok
    }
}
