//! Domain entities and the metadata repository interface for fracstore.
//!
//! The durable metadata repository itself (tables, fractures, racks, replica
//! groups and their physical partitions) is an external collaborator; this
//! crate defines its entities and the synchronous, fallible
//! [`MetadataRepository`] interface the placement engine is written against.
//! [`MemoryRepository`] is a deterministic in-memory implementation used by
//! tests and the offline simulator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entities;
pub mod memory;
pub mod repository;

pub use entities::{
    Fracture, FractureStatus, NodeStatus, PartitionStatus, Rack, RackAssignment, RackNode,
    RackStatus, ReplicaGroup, ReplicaPartition, ReplicaScheme, SubPartitionScheme, Table,
};
pub use memory::MemoryRepository;
pub use repository::MetadataRepository;
