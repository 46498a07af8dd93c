//! Sluice Workflow
//!
//! This crate provides the resolved workflow representation for sluice.
//! A [`Workflow`] is built once from a [`WorkflowDef`](sluice_config::WorkflowDef),
//! validated, and then shared read-only between executions.
//!
//! Key differences from `sluice-config`:
//! - All nodes, including Map iterators and Parallel branches, live in one
//!   flat arena addressed by [`NodeId`]
//! - `next` links and child chains are arena ids rather than names
//! - The graph is validated: unique ids, no cycles, no orphans, and a single
//!   linear path through every chain

mod error;
mod graph;
mod node;
mod resolver;
mod workflow;

pub use error::WorkflowError;
pub use node::{Node, NodeId, NodeKind};
pub use resolver::resolve;
pub use workflow::{ChainIter, Workflow};

pub use sluice_config::{ResultFormat, ResultPath, ServiceCall};
