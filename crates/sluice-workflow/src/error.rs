use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNodeId(String),

  #[error("edge references unknown node: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  #[error("edge from '{from}' to '{to}' leaves its chain")]
  CrossChainEdge { from: String, to: String },

  #[error("node '{0}' has more than one predecessor")]
  MultiplePredecessors(String),

  #[error("cycle detected in workflow graph")]
  CycleDetected,

  #[error("node '{0}' is not reachable from its chain start")]
  UnreachableNode(String),

  #[error("chain starting at '{0}' is empty")]
  EmptyChain(String),

  #[error("parallel node '{0}' declares no branches")]
  NoBranches(String),
}
