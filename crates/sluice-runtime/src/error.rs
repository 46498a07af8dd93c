//! Runtime error types.

use sluice_codec::CodecError;
use sluice_document::PathError;
use sluice_store::StoreError;
use sluice_workflow::WorkflowError;

use crate::task::TaskError;

/// Errors that can occur during workflow execution.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// The workflow cannot run: graph validation failed or a task function is
  /// not registered.
  #[error("invalid workflow definition: {message}")]
  InvalidDefinition { message: String },

  /// A node failed.
  #[error("node '{node_id}' failed: {source}")]
  NodeFailed {
    node_id: String,
    #[source]
    source: NodeError,
  },

  /// A Map element failed.
  #[error("map '{node_id}' failed at element {index}: {source}")]
  ElementFailed {
    node_id: String,
    index: usize,
    #[source]
    source: Box<RuntimeError>,
  },

  /// A Parallel branch failed.
  #[error("parallel '{node_id}' failed in branch {branch}: {source}")]
  BranchFailed {
    node_id: String,
    branch: usize,
    #[source]
    source: Box<RuntimeError>,
  },

  /// The execution ran past its wall-clock ceiling.
  #[error("execution timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  /// A spawned child task panicked or was aborted unexpectedly.
  #[error("child task join error: {message}")]
  Join { message: String },
}

impl RuntimeError {
  /// The innermost error, past any Map/Parallel wrapping.
  pub fn root_cause(&self) -> &RuntimeError {
    match self {
      RuntimeError::ElementFailed { source, .. } | RuntimeError::BranchFailed { source, .. } => {
        source.root_cause()
      }
      other => other,
    }
  }
}

impl From<WorkflowError> for RuntimeError {
  fn from(e: WorkflowError) -> Self {
    RuntimeError::InvalidDefinition {
      message: e.to_string(),
    }
  }
}

/// What went wrong inside a single node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
  #[error("task '{function}' failed: {source}")]
  Task {
    function: String,
    #[source]
    source: TaskError,
  },

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Codec(#[from] CodecError),

  #[error(transparent)]
  Path(#[from] PathError),

  /// The selected input has the wrong shape for the node.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },
}
