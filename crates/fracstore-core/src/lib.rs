//! Core types and utilities shared across fracstore components.
//!
//! This crate provides the fundamental building blocks used by the metadata,
//! placement and simulation crates:
//! - Error taxonomy with a common `Result` alias
//! - Plain id types for the domain entities

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    AssignmentId, EntityKind, FractureId, GroupId, NodeId, PartitionId, RackId, SchemeId, TableId,
};
