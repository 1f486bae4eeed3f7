//! The metadata repository interface.
//!
//! Every call is synchronous and fallible; a `NotFound` or I/O failure
//! propagates to the caller unmodified. Implementations must provide at
//! least read-committed isolation and make rack-assignment creation safe
//! under concurrent callers for different fractures. Each create/update is
//! its own atomic unit; the placement engine never asks for a multi-step
//! transaction.

use fracstore_core::types::{
    FractureId, GroupId, NodeId, PartitionId, RackId, SchemeId, TableId,
};
use fracstore_core::Result;

use crate::entities::{
    Fracture, NodeStatus, PartitionStatus, Rack, RackAssignment, RackNode, RackStatus,
    ReplicaGroup, ReplicaPartition, ReplicaScheme, SubPartitionScheme, Table,
};

/// Query and update operations the placement engine performs against the
/// metadata store.
///
/// All listing methods return entities in ascending id order; the placement
/// engine's tie-break rules depend on that determinism.
pub trait MetadataRepository: Send + Sync {
    /// All tables, ascending by id.
    fn all_tables(&self) -> Result<Vec<Table>>;

    /// A single table.
    fn table(&self, id: TableId) -> Result<Table>;

    /// Replica groups of a table, ascending by id.
    fn replica_groups(&self, table: TableId) -> Result<Vec<ReplicaGroup>>;

    /// A single replica group.
    fn replica_group(&self, id: GroupId) -> Result<ReplicaGroup>;

    /// Replica schemes of a group, ascending by id.
    fn replica_schemes(&self, group: GroupId) -> Result<Vec<ReplicaScheme>>;

    /// A single replica scheme.
    fn replica_scheme(&self, id: SchemeId) -> Result<ReplicaScheme>;

    /// Fractures of a table, ascending by id.
    fn fractures(&self, table: TableId) -> Result<Vec<Fracture>>;

    /// A single fracture.
    fn fracture(&self, id: FractureId) -> Result<Fracture>;

    /// All racks, ascending by id.
    fn all_racks(&self) -> Result<Vec<Rack>>;

    /// A single rack.
    fn rack(&self, id: RackId) -> Result<Rack>;

    /// Nodes of a rack, ascending by id.
    fn rack_nodes(&self, rack: RackId) -> Result<Vec<RackNode>>;

    /// A single node.
    fn rack_node(&self, id: NodeId) -> Result<RackNode>;

    /// Rack assignments recorded for a fracture, ascending by id.
    fn rack_assignments_by_fracture(&self, fracture: FractureId) -> Result<Vec<RackAssignment>>;

    /// Record that `rack` may host replicas of `(fracture, group)`.
    ///
    /// Assignments are append-only; an exact duplicate is a conflict.
    fn create_rack_assignment(
        &self,
        rack: RackId,
        fracture: FractureId,
        group: GroupId,
    ) -> Result<RackAssignment>;

    /// The sub-partition scheme of a (fracture, group) pair.
    fn sub_partition_scheme(
        &self,
        fracture: FractureId,
        group: GroupId,
    ) -> Result<SubPartitionScheme>;

    /// Replica partitions of a replica scheme, ascending by id.
    fn replica_partitions_by_scheme(&self, scheme: SchemeId) -> Result<Vec<ReplicaPartition>>;

    /// Replica partitions currently hosted on a node, ascending by id.
    fn replica_partitions_on_node(&self, node: NodeId) -> Result<Vec<ReplicaPartition>>;

    /// Number of replica partitions assigned to a node (any status except
    /// [`PartitionStatus::Lost`]).
    fn node_partition_count(&self, node: NodeId) -> Result<u32>;

    /// Create a replica partition on `node`.
    fn create_replica_partition(
        &self,
        fracture: FractureId,
        scheme: SchemeId,
        index: usize,
        node: NodeId,
    ) -> Result<ReplicaPartition>;

    /// Move a replica partition to a new node, updating its status.
    ///
    /// Used by the loss handlers to record a recovery destination; physically
    /// moving bytes is the column-storage layer's job.
    fn reassign_replica_partition(
        &self,
        partition: PartitionId,
        node: NodeId,
        status: PartitionStatus,
    ) -> Result<ReplicaPartition>;

    /// Update a rack's status.
    fn update_rack_status(&self, rack: RackId, status: RackStatus) -> Result<()>;

    /// Update a node's status.
    fn update_node_status(&self, node: NodeId, status: NodeStatus) -> Result<()>;
}
