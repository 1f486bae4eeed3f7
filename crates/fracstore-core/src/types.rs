//! Plain id types for the fracstore domain.
//!
//! Ids are assigned by the metadata repository and are unique per entity
//! kind. They are plain integers rather than newtypes so that repository
//! implementations can store them directly; the [`EntityKind`] discriminant
//! keeps error reporting unambiguous.

use serde::{Deserialize, Serialize};

/// Unique identifier for a table.
pub type TableId = u64;

/// Unique identifier for a fracture (an immutable, time-windowed slice of a table).
pub type FractureId = u64;

/// Unique identifier for a replica group.
pub type GroupId = u64;

/// Unique identifier for a replica scheme (one physical replication strategy
/// within a group).
pub type SchemeId = u64;

/// Unique identifier for a rack.
pub type RackId = u64;

/// Unique identifier for a node within a rack.
pub type NodeId = u64;

/// Unique identifier for a rack assignment record.
pub type AssignmentId = u64;

/// Unique identifier for a replica partition.
pub type PartitionId = u64;

/// The kind of entity an id refers to, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A table.
    Table,
    /// A fracture.
    Fracture,
    /// A replica group.
    ReplicaGroup,
    /// A replica scheme.
    ReplicaScheme,
    /// A rack.
    Rack,
    /// A node within a rack.
    RackNode,
    /// A rack assignment record.
    RackAssignment,
    /// A sub-partition scheme.
    SubPartitionScheme,
    /// A replica partition.
    ReplicaPartition,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Fracture => "fracture",
            Self::ReplicaGroup => "replica group",
            Self::ReplicaScheme => "replica scheme",
            Self::Rack => "rack",
            Self::RackNode => "rack node",
            Self::RackAssignment => "rack assignment",
            Self::SubPartitionScheme => "sub-partition scheme",
            Self::ReplicaPartition => "replica partition",
        };
        f.write_str(name)
    }
}
