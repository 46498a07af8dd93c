use serde::{Deserialize, Serialize};

use crate::node::NodeDef;

/// A complete workflow definition as loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  /// Wall-clock ceiling for one execution. Falls back to the runtime default.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  pub start_at: String,
  pub nodes: Vec<NodeDef>,
}

impl WorkflowDef {
  pub fn new(workflow_id: impl Into<String>, name: impl Into<String>, chain: ChainDef) -> Self {
    WorkflowDef {
      workflow_id: workflow_id.into(),
      name: name.into(),
      timeout_ms: None,
      start_at: chain.start_at,
      nodes: chain.nodes,
    }
  }

  pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.timeout_ms = Some(timeout_ms);
    self
  }
}

/// A linear sequence of nodes, used for the top level, Map iterators and
/// Parallel branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDef {
  pub start_at: String,
  pub nodes: Vec<NodeDef>,
}

impl ChainDef {
  /// Begin a chain with `node`.
  pub fn start(node: NodeDef) -> Self {
    ChainDef {
      start_at: node.node_id.clone(),
      nodes: vec![node],
    }
  }

  /// Append `node`, linking the previous tail to it.
  pub fn next(mut self, node: NodeDef) -> Self {
    if let Some(tail) = self.nodes.last_mut() {
      tail.next = Some(node.node_id.clone());
    }
    self.nodes.push(node);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builder_links_nodes() {
    let chain = ChainDef::start(NodeDef::pass("a"))
      .next(NodeDef::pass("b"))
      .next(NodeDef::pass("c"));

    assert_eq!(chain.start_at, "a");
    let links: Vec<_> = chain.nodes.iter().map(|n| n.next.as_deref()).collect();
    assert_eq!(links, vec![Some("b"), Some("c"), None]);
  }

  #[test]
  fn test_workflow_json() {
    let def = WorkflowDef::new("wf", "Workflow", ChainDef::start(NodeDef::pass("only")))
      .with_timeout_ms(5000);

    let text = serde_json::to_string(&def).unwrap();
    let back: WorkflowDef = serde_json::from_str(&text).unwrap();
    assert_eq!(back, def);
    assert_eq!(back.timeout_ms, Some(5000));
  }
}
