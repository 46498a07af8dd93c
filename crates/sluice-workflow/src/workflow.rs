use std::collections::HashMap;

use crate::node::{Node, NodeId, NodeKind};

/// A resolved workflow ready for execution.
///
/// Immutable once built by [`resolve`](crate::resolve); wrap it in an `Arc`
/// to share between concurrent executions.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
  pub workflow_id: String,
  pub name: String,
  pub timeout_ms: Option<u64>,
  pub(crate) start: NodeId,
  pub(crate) nodes: Vec<Node>,
  pub(crate) index: HashMap<String, NodeId>,
}

impl Workflow {
  /// Entry point of the top-level chain.
  pub fn start(&self) -> NodeId {
    self.start
  }

  /// Get a node by arena id.
  ///
  /// Ids handed out by this workflow are always valid.
  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.0]
  }

  /// Get a node by its configured id.
  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.index.get(node_id).map(|id| self.node(*id))
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  /// Walk a chain from `start` along `next` links.
  pub fn chain(&self, start: NodeId) -> ChainIter<'_> {
    ChainIter {
      workflow: self,
      current: Some(start),
    }
  }

  /// Names of every task function referenced anywhere in the workflow.
  pub fn task_functions(&self) -> impl Iterator<Item = (&str, &str)> {
    self.nodes.iter().filter_map(|node| match &node.kind {
      NodeKind::Task { function, .. } => Some((node.node_id.as_str(), function.as_str())),
      _ => None,
    })
  }
}

/// Iterator over the nodes of one chain.
pub struct ChainIter<'a> {
  workflow: &'a Workflow,
  current: Option<NodeId>,
}

impl<'a> Iterator for ChainIter<'a> {
  type Item = &'a Node;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.workflow.node(self.current?);
    self.current = node.next;
    Some(node)
  }
}
