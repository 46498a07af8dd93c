//! Sluice Runtime
//!
//! This crate provides the workflow runtime for sluice. It walks a resolved
//! [`Workflow`](sluice_workflow::Workflow) against an input document and
//! returns the final document.
//!
//! - [`Runtime`] owns the shared workflow, task registry and record store and
//!   exposes `invoke(input, cancel)`
//! - [`TaskHandler`] is the seam for external task collaborators, with
//!   [`FnTask`] for closures and [`HttpTask`] for JSON-over-HTTP functions
//! - Map and Parallel nodes fan out onto tokio tasks against isolated copies
//!   of the document and merge results by index

mod error;
mod http;
mod result;
mod runtime;
mod service;
mod task;

pub use error::{NodeError, RuntimeError};
pub use http::HttpTask;
pub use result::ExecutionResult;
pub use runtime::{DEFAULT_TIMEOUT, Runtime, RuntimeConfig};
pub use task::{FnTask, TaskError, TaskHandler, TaskRegistry};
