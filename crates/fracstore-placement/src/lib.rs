//! Rack-aware replica placement for fracstore.
//!
//! This crate decides *where* replica partitions live; moving bytes is the
//! column-storage layer's job. Placement reacts to four coarse cluster
//! events (rack added, fracture added, rack lost, node lost) and follows a
//! greedy, no-data-movement heuristic: committed rack assignments are never
//! revisited, only new capacity is exploited.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    PlacementEngine                       │
//! │   on_new_rack / on_new_fracture / on_lost_rack /         │
//! │   on_lost_rack_node                                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  PlacementQueue        │  NodeUsageTracker               │
//! │  (least-loaded node,   │  (per-pass assigned counts and  │
//! │   no-duplicate rule)   │   held sub-partitions)          │
//! ├──────────────────────────────────────────────────────────┤
//! │             MetadataRepository (injected)                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use fracstore_meta::{MemoryRepository, MetadataRepository};
//! use fracstore_placement::PlacementEngine;
//!
//! let repo = Arc::new(MemoryRepository::new());
//! let table = repo.create_table("events");
//! let group = repo.create_replica_group(table.id, (0, 999)).unwrap();
//! repo.create_replica_scheme(group.id, "ts").unwrap();
//! let rack = repo.create_rack("rack-a");
//! repo.create_rack_node(rack.id, "n0").unwrap();
//!
//! let fracture = repo.create_fracture(table.id, (0, 3600), 10_000).unwrap();
//! repo.create_sub_partition_scheme(fracture.id, group.id, vec![(0, 499), (500, 999)]).unwrap();
//!
//! let engine = PlacementEngine::new(repo.clone());
//! engine.on_new_fracture(fracture.id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod queue;
pub mod usage;

pub use engine::{PlacementEngine, RecoveryAction, RecoveryPlan, TopologyEvent};
pub use queue::PlacementQueue;
pub use usage::{NodeUsage, NodeUsageTracker};
