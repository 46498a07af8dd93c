//! Sluice Config
//!
//! This crate contains the serializable workflow configuration types for
//! sluice. These types describe a workflow before it is validated and
//! resolved into an arena by `sluice-workflow`.
//!
//! Definitions can be written as JSON files (loaded by the CLI) or built in
//! code with the fluent [`ChainDef`] builder:
//!
//! ```
//! use sluice_config::{ChainDef, NodeDef, WorkflowDef};
//!
//! let chain = ChainDef::start(NodeDef::pass("shape")).next(NodeDef::task("call", "double-number"));
//! let workflow = WorkflowDef::new("example", "Example", chain);
//! assert_eq!(workflow.start_at, "shape");
//! ```

mod node;
mod parameter;
mod service;
mod workflow;

pub use node::{NodeDef, NodeType, ResultFormat, ResultPath};
pub use parameter::Parameter;
pub use service::{AttributeDef, KeyDef, ServiceCall, UpdateAction, UpdateDef};
pub use workflow::{ChainDef, WorkflowDef};
