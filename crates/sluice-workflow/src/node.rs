use std::fmt;

use indexmap::IndexMap;
use sluice_config::{Parameter, ResultFormat, ResultPath, ServiceCall};
use sluice_document::{Document, DocumentPath};

/// Index of a node in the workflow arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A resolved node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
  pub id: NodeId,
  pub node_id: String,
  pub kind: NodeKind,
  pub input_path: DocumentPath,
  pub result_path: ResultPath,
  pub output_path: Option<DocumentPath>,
  pub next: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
  Pass {
    parameters: Option<IndexMap<String, Parameter>>,
    result: Option<Document>,
  },
  Task {
    function: String,
    result_format: ResultFormat,
  },
  Map {
    items_path: DocumentPath,
    /// Start of the iterator chain.
    iterator: NodeId,
    max_concurrency: usize,
  },
  Parallel {
    /// Start of each branch chain, in declaration order.
    branches: Vec<NodeId>,
  },
  ServiceCall(ServiceCall),
}

impl NodeKind {
  pub fn name(&self) -> &'static str {
    match self {
      NodeKind::Pass { .. } => "pass",
      NodeKind::Task { .. } => "task",
      NodeKind::Map { .. } => "map",
      NodeKind::Parallel { .. } => "parallel",
      NodeKind::ServiceCall(_) => "service_call",
    }
  }

  /// Entry points of the chains owned by this node.
  pub fn child_chains(&self) -> Vec<NodeId> {
    match self {
      NodeKind::Map { iterator, .. } => vec![*iterator],
      NodeKind::Parallel { branches } => branches.clone(),
      _ => Vec::new(),
    }
  }
}
