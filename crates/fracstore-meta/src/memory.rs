//! In-memory metadata repository.
//!
//! `BTreeMap`-backed so every listing iterates in ascending id order, which
//! the placement engine's tie-break rules rely on. Used by unit and
//! integration tests and by embedders as a scaffold; production deployments
//! provide a durable [`MetadataRepository`] implementation instead.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use fracstore_core::types::{
    AssignmentId, EntityKind, FractureId, GroupId, NodeId, PartitionId, RackId, SchemeId, TableId,
};
use fracstore_core::{Error, Result};

use crate::entities::{
    Fracture, FractureStatus, NodeStatus, PartitionStatus, Rack, RackAssignment, RackNode,
    RackStatus, ReplicaGroup, ReplicaPartition, ReplicaScheme, SubPartitionScheme, Table,
};
use crate::repository::MetadataRepository;

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<TableId, Table>,
    racks: BTreeMap<RackId, Rack>,
    nodes: BTreeMap<NodeId, RackNode>,
    groups: BTreeMap<GroupId, ReplicaGroup>,
    schemes: BTreeMap<SchemeId, ReplicaScheme>,
    fractures: BTreeMap<FractureId, Fracture>,
    assignments: BTreeMap<AssignmentId, RackAssignment>,
    sub_partitions: BTreeMap<(FractureId, GroupId), SubPartitionScheme>,
    partitions: BTreeMap<PartitionId, ReplicaPartition>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A deterministic in-memory [`MetadataRepository`].
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table.
    pub fn create_table(&self, name: impl Into<String>) -> Table {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let table = Table { id, name: name.into() };
        inner.tables.insert(id, table.clone());
        table
    }

    /// Create a healthy rack.
    pub fn create_rack(&self, name: impl Into<String>) -> Rack {
        let mut inner = self.inner.write();
        let id = inner.next_id();
        let rack = Rack::new(id, name);
        inner.racks.insert(id, rack.clone());
        rack
    }

    /// Create a healthy node in a rack.
    pub fn create_rack_node(&self, rack: RackId, name: impl Into<String>) -> Result<RackNode> {
        let mut inner = self.inner.write();
        if !inner.racks.contains_key(&rack) {
            return Err(Error::not_found(EntityKind::Rack, rack));
        }
        let id = inner.next_id();
        let node = RackNode::new(id, rack, name);
        inner.nodes.insert(id, node.clone());
        Ok(node)
    }

    /// Create a replica group for a table.
    pub fn create_replica_group(&self, table: TableId, key_range: (i64, i64)) -> Result<ReplicaGroup> {
        let mut inner = self.inner.write();
        if !inner.tables.contains_key(&table) {
            return Err(Error::not_found(EntityKind::Table, table));
        }
        let id = inner.next_id();
        let group = ReplicaGroup { id, table, key_range };
        inner.groups.insert(id, group.clone());
        Ok(group)
    }

    /// Create a replica scheme for a group.
    pub fn create_replica_scheme(
        &self,
        group: GroupId,
        sort_column: impl Into<String>,
    ) -> Result<ReplicaScheme> {
        let mut inner = self.inner.write();
        if !inner.groups.contains_key(&group) {
            return Err(Error::not_found(EntityKind::ReplicaGroup, group));
        }
        let id = inner.next_id();
        let scheme = ReplicaScheme { id, group, sort_column: sort_column.into() };
        inner.schemes.insert(id, scheme.clone());
        Ok(scheme)
    }

    /// Create an active fracture for a table.
    pub fn create_fracture(
        &self,
        table: TableId,
        window: (i64, i64),
        tuple_count: u64,
    ) -> Result<Fracture> {
        let mut inner = self.inner.write();
        if !inner.tables.contains_key(&table) {
            return Err(Error::not_found(EntityKind::Table, table));
        }
        let id = inner.next_id();
        let fracture =
            Fracture { id, table, window, tuple_count, status: FractureStatus::Active };
        inner.fractures.insert(id, fracture.clone());
        Ok(fracture)
    }

    /// Record the sub-partition ranges of a (fracture, group) pair.
    pub fn create_sub_partition_scheme(
        &self,
        fracture: FractureId,
        group: GroupId,
        ranges: Vec<(i64, i64)>,
    ) -> Result<SubPartitionScheme> {
        let mut inner = self.inner.write();
        if !inner.fractures.contains_key(&fracture) {
            return Err(Error::not_found(EntityKind::Fracture, fracture));
        }
        if !inner.groups.contains_key(&group) {
            return Err(Error::not_found(EntityKind::ReplicaGroup, group));
        }
        let scheme = SubPartitionScheme { fracture, group, ranges };
        inner.sub_partitions.insert((fracture, group), scheme.clone());
        Ok(scheme)
    }

    /// Total number of rack assignments (tests assert the append-only rule
    /// through this).
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.inner.read().assignments.len()
    }

    /// A replica partition by id.
    pub fn replica_partition(&self, id: PartitionId) -> Result<ReplicaPartition> {
        self.inner
            .read()
            .partitions
            .get(&id)
            .cloned()
            .ok_or(Error::not_found(EntityKind::ReplicaPartition, id))
    }
}

impl MetadataRepository for MemoryRepository {
    fn all_tables(&self) -> Result<Vec<Table>> {
        Ok(self.inner.read().tables.values().cloned().collect())
    }

    fn table(&self, id: TableId) -> Result<Table> {
        self.inner.read().tables.get(&id).cloned().ok_or(Error::not_found(EntityKind::Table, id))
    }

    fn replica_groups(&self, table: TableId) -> Result<Vec<ReplicaGroup>> {
        let inner = self.inner.read();
        if !inner.tables.contains_key(&table) {
            return Err(Error::not_found(EntityKind::Table, table));
        }
        Ok(inner.groups.values().filter(|g| g.table == table).cloned().collect())
    }

    fn replica_group(&self, id: GroupId) -> Result<ReplicaGroup> {
        self.inner
            .read()
            .groups
            .get(&id)
            .cloned()
            .ok_or(Error::not_found(EntityKind::ReplicaGroup, id))
    }

    fn replica_schemes(&self, group: GroupId) -> Result<Vec<ReplicaScheme>> {
        let inner = self.inner.read();
        if !inner.groups.contains_key(&group) {
            return Err(Error::not_found(EntityKind::ReplicaGroup, group));
        }
        Ok(inner.schemes.values().filter(|s| s.group == group).cloned().collect())
    }

    fn replica_scheme(&self, id: SchemeId) -> Result<ReplicaScheme> {
        self.inner
            .read()
            .schemes
            .get(&id)
            .cloned()
            .ok_or(Error::not_found(EntityKind::ReplicaScheme, id))
    }

    fn fractures(&self, table: TableId) -> Result<Vec<Fracture>> {
        let inner = self.inner.read();
        if !inner.tables.contains_key(&table) {
            return Err(Error::not_found(EntityKind::Table, table));
        }
        Ok(inner.fractures.values().filter(|f| f.table == table).cloned().collect())
    }

    fn fracture(&self, id: FractureId) -> Result<Fracture> {
        self.inner
            .read()
            .fractures
            .get(&id)
            .cloned()
            .ok_or(Error::not_found(EntityKind::Fracture, id))
    }

    fn all_racks(&self) -> Result<Vec<Rack>> {
        Ok(self.inner.read().racks.values().cloned().collect())
    }

    fn rack(&self, id: RackId) -> Result<Rack> {
        self.inner.read().racks.get(&id).cloned().ok_or(Error::not_found(EntityKind::Rack, id))
    }

    fn rack_nodes(&self, rack: RackId) -> Result<Vec<RackNode>> {
        let inner = self.inner.read();
        if !inner.racks.contains_key(&rack) {
            return Err(Error::not_found(EntityKind::Rack, rack));
        }
        Ok(inner.nodes.values().filter(|n| n.rack == rack).cloned().collect())
    }

    fn rack_node(&self, id: NodeId) -> Result<RackNode> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .cloned()
            .ok_or(Error::not_found(EntityKind::RackNode, id))
    }

    fn rack_assignments_by_fracture(&self, fracture: FractureId) -> Result<Vec<RackAssignment>> {
        let inner = self.inner.read();
        if !inner.fractures.contains_key(&fracture) {
            return Err(Error::not_found(EntityKind::Fracture, fracture));
        }
        Ok(inner.assignments.values().filter(|a| a.fracture == fracture).cloned().collect())
    }

    fn create_rack_assignment(
        &self,
        rack: RackId,
        fracture: FractureId,
        group: GroupId,
    ) -> Result<RackAssignment> {
        let mut inner = self.inner.write();
        if !inner.racks.contains_key(&rack) {
            return Err(Error::not_found(EntityKind::Rack, rack));
        }
        if !inner.fractures.contains_key(&fracture) {
            return Err(Error::not_found(EntityKind::Fracture, fracture));
        }
        let duplicate = inner
            .assignments
            .values()
            .any(|a| a.rack == rack && a.fracture == fracture && a.group == group);
        if duplicate {
            return Err(Error::Conflict(format!(
                "rack {rack} is already assigned to fracture {fracture} group {group}"
            )));
        }
        let id = inner.next_id();
        let assignment = RackAssignment { id, rack, fracture, group };
        inner.assignments.insert(id, assignment.clone());
        Ok(assignment)
    }

    fn sub_partition_scheme(
        &self,
        fracture: FractureId,
        group: GroupId,
    ) -> Result<SubPartitionScheme> {
        self.inner
            .read()
            .sub_partitions
            .get(&(fracture, group))
            .cloned()
            .ok_or(Error::not_found(EntityKind::SubPartitionScheme, fracture))
    }

    fn replica_partitions_by_scheme(&self, scheme: SchemeId) -> Result<Vec<ReplicaPartition>> {
        Ok(self
            .inner
            .read()
            .partitions
            .values()
            .filter(|p| p.scheme == scheme)
            .cloned()
            .collect())
    }

    fn replica_partitions_on_node(&self, node: NodeId) -> Result<Vec<ReplicaPartition>> {
        Ok(self.inner.read().partitions.values().filter(|p| p.node == node).cloned().collect())
    }

    fn node_partition_count(&self, node: NodeId) -> Result<u32> {
        let count = self
            .inner
            .read()
            .partitions
            .values()
            .filter(|p| p.node == node && p.status != PartitionStatus::Lost)
            .count();
        Ok(count as u32)
    }

    fn create_replica_partition(
        &self,
        fracture: FractureId,
        scheme: SchemeId,
        index: usize,
        node: NodeId,
    ) -> Result<ReplicaPartition> {
        let mut inner = self.inner.write();
        if !inner.schemes.contains_key(&scheme) {
            return Err(Error::not_found(EntityKind::ReplicaScheme, scheme));
        }
        if !inner.nodes.contains_key(&node) {
            return Err(Error::not_found(EntityKind::RackNode, node));
        }
        let id = inner.next_id();
        let partition =
            ReplicaPartition { id, fracture, scheme, index, node, status: PartitionStatus::Ok };
        inner.partitions.insert(id, partition.clone());
        Ok(partition)
    }

    fn reassign_replica_partition(
        &self,
        partition: PartitionId,
        node: NodeId,
        status: PartitionStatus,
    ) -> Result<ReplicaPartition> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(&node) {
            return Err(Error::not_found(EntityKind::RackNode, node));
        }
        let part = inner
            .partitions
            .get_mut(&partition)
            .ok_or(Error::not_found(EntityKind::ReplicaPartition, partition))?;
        part.node = node;
        part.status = status;
        Ok(part.clone())
    }

    fn update_rack_status(&self, rack: RackId, status: RackStatus) -> Result<()> {
        let mut inner = self.inner.write();
        let rack = inner.racks.get_mut(&rack).ok_or(Error::not_found(EntityKind::Rack, rack))?;
        rack.status = status;
        Ok(())
    }

    fn update_node_status(&self, node: NodeId, status: NodeStatus) -> Result<()> {
        let mut inner = self.inner.write();
        let node =
            inner.nodes.get_mut(&node).ok_or(Error::not_found(EntityKind::RackNode, node))?;
        node.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_list_in_id_order() {
        let repo = MemoryRepository::new();
        let table = repo.create_table("events");
        let g1 = repo.create_replica_group(table.id, (0, 999)).unwrap();
        let g2 = repo.create_replica_group(table.id, (1000, 1999)).unwrap();

        let groups = repo.replica_groups(table.id).unwrap();
        assert_eq!(groups.iter().map(|g| g.id).collect::<Vec<_>>(), vec![g1.id, g2.id]);
    }

    #[test]
    fn test_missing_entities() {
        let repo = MemoryRepository::new();
        assert!(repo.table(99).unwrap_err().is_not_found());
        assert!(repo.rack(99).unwrap_err().is_not_found());
        assert!(repo.create_rack_node(99, "n0").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_assignment_conflicts() {
        let repo = MemoryRepository::new();
        let table = repo.create_table("events");
        let rack = repo.create_rack("rack-a");
        let group = repo.create_replica_group(table.id, (0, 999)).unwrap();
        let fracture = repo.create_fracture(table.id, (0, 3600), 1_000).unwrap();

        repo.create_rack_assignment(rack.id, fracture.id, group.id).unwrap();
        let err = repo.create_rack_assignment(rack.id, fracture.id, group.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(repo.assignment_count(), 1);
    }

    #[test]
    fn test_partition_lifecycle() {
        let repo = MemoryRepository::new();
        let table = repo.create_table("events");
        let rack = repo.create_rack("rack-a");
        let n1 = repo.create_rack_node(rack.id, "n1").unwrap();
        let n2 = repo.create_rack_node(rack.id, "n2").unwrap();
        let group = repo.create_replica_group(table.id, (0, 999)).unwrap();
        let scheme = repo.create_replica_scheme(group.id, "ts").unwrap();
        let fracture = repo.create_fracture(table.id, (0, 3600), 1_000).unwrap();

        let part = repo.create_replica_partition(fracture.id, scheme.id, 0, n1.id).unwrap();
        assert_eq!(repo.node_partition_count(n1.id).unwrap(), 1);
        assert_eq!(repo.node_partition_count(n2.id).unwrap(), 0);

        let moved = repo
            .reassign_replica_partition(part.id, n2.id, PartitionStatus::BeingRecovered)
            .unwrap();
        assert_eq!(moved.node, n2.id);
        assert_eq!(moved.status, PartitionStatus::BeingRecovered);
        assert_eq!(repo.node_partition_count(n1.id).unwrap(), 0);
        assert_eq!(repo.node_partition_count(n2.id).unwrap(), 1);
    }

    #[test]
    fn test_lost_partitions_not_counted() {
        let repo = MemoryRepository::new();
        let table = repo.create_table("events");
        let rack = repo.create_rack("rack-a");
        let n1 = repo.create_rack_node(rack.id, "n1").unwrap();
        let group = repo.create_replica_group(table.id, (0, 999)).unwrap();
        let scheme = repo.create_replica_scheme(group.id, "ts").unwrap();
        let fracture = repo.create_fracture(table.id, (0, 3600), 1_000).unwrap();

        let part = repo.create_replica_partition(fracture.id, scheme.id, 0, n1.id).unwrap();
        repo.reassign_replica_partition(part.id, n1.id, PartitionStatus::Lost).unwrap();
        assert_eq!(repo.node_partition_count(n1.id).unwrap(), 0);
    }
}
