use std::collections::{HashMap, HashSet};

use sluice_config::{NodeDef, NodeType, WorkflowDef};

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::workflow::Workflow;

/// Resolve a workflow definition into a validated arena.
///
/// This process:
/// 1. Flattens the top-level chain and every nested Map/Parallel chain into
///    one arena, rejecting duplicate node ids
/// 2. Resolves `next` names to arena ids within each chain
/// 3. Checks that every node has at most one predecessor, that the graph is
///    acyclic, and that every node is reachable from its chain start
pub fn resolve(def: WorkflowDef) -> Result<Workflow, WorkflowError> {
  let mut builder = Builder::default();
  let start = builder.add_chain(def.start_at, def.nodes)?;
  builder.link_next()?;
  builder.validate()?;

  Ok(Workflow {
    workflow_id: def.workflow_id,
    name: def.name,
    timeout_ms: def.timeout_ms,
    start,
    nodes: builder.nodes,
    index: builder.index,
  })
}

struct ChainInfo {
  start: NodeId,
  members: Vec<NodeId>,
}

#[derive(Default)]
struct Builder {
  nodes: Vec<Node>,
  index: HashMap<String, NodeId>,
  chains: Vec<ChainInfo>,
  /// Chain index for each node, parallel to `nodes`.
  chain_of: Vec<usize>,
  /// Unresolved `next` names.
  pending_next: Vec<(NodeId, String)>,
}

impl Builder {
  fn add_chain(&mut self, start_at: String, defs: Vec<NodeDef>) -> Result<NodeId, WorkflowError> {
    if defs.is_empty() {
      return Err(WorkflowError::EmptyChain(start_at));
    }

    // Reserve the chain slot before recursing so nested chains get later indices.
    let chain_idx = self.chains.len();
    self.chains.push(ChainInfo {
      start: NodeId(0),
      members: Vec::new(),
    });

    let mut local: HashMap<String, NodeId> = HashMap::new();
    for def in defs {
      let kind = self.resolve_kind(&def.node_id, def.node_type)?;

      if self.index.contains_key(&def.node_id) {
        return Err(WorkflowError::DuplicateNodeId(def.node_id));
      }

      let id = NodeId(self.nodes.len());
      self.index.insert(def.node_id.clone(), id);
      local.insert(def.node_id.clone(), id);
      if let Some(next) = def.next {
        self.pending_next.push((id, next));
      }

      self.nodes.push(Node {
        id,
        node_id: def.node_id,
        kind,
        input_path: def.input_path,
        result_path: def.result_path,
        output_path: def.output_path,
        next: None,
      });
      self.chain_of.push(chain_idx);
      self.chains[chain_idx].members.push(id);
    }

    let start = *local
      .get(&start_at)
      .ok_or(WorkflowError::NodeNotFound(start_at))?;
    self.chains[chain_idx].start = start;
    Ok(start)
  }

  fn resolve_kind(&mut self, node_id: &str, node_type: NodeType) -> Result<NodeKind, WorkflowError> {
    Ok(match node_type {
      NodeType::Pass { parameters, result } => NodeKind::Pass { parameters, result },
      NodeType::Task {
        function,
        result_format,
      } => NodeKind::Task {
        function,
        result_format,
      },
      NodeType::Map {
        items_path,
        iterator,
        max_concurrency,
      } => NodeKind::Map {
        items_path,
        iterator: self.add_chain(iterator.start_at, iterator.nodes)?,
        max_concurrency,
      },
      NodeType::Parallel { branches } => {
        if branches.is_empty() {
          return Err(WorkflowError::NoBranches(node_id.to_string()));
        }
        let branches = branches
          .into_iter()
          .map(|chain| self.add_chain(chain.start_at, chain.nodes))
          .collect::<Result<Vec<_>, _>>()?;
        NodeKind::Parallel { branches }
      }
      NodeType::ServiceCall(call) => NodeKind::ServiceCall(call),
    })
  }

  fn link_next(&mut self) -> Result<(), WorkflowError> {
    for (from, to_name) in std::mem::take(&mut self.pending_next) {
      let from_name = self.nodes[from.0].node_id.clone();
      let Some(&to) = self.index.get(&to_name) else {
        return Err(WorkflowError::InvalidEdge {
          from: from_name,
          to: to_name,
        });
      };
      if self.chain_of[from.0] != self.chain_of[to.0] {
        return Err(WorkflowError::CrossChainEdge {
          from: from_name,
          to: to_name,
        });
      }
      self.nodes[from.0].next = Some(to);
    }
    Ok(())
  }

  fn validate(&self) -> Result<(), WorkflowError> {
    let mut graph = Graph::new(self.nodes.len());
    for node in &self.nodes {
      if let Some(next) = node.next {
        graph.add_edge(node.id, next);
      }
      for child in node.kind.child_chains() {
        graph.add_edge(node.id, child);
      }
    }

    if let Some(node) = self.nodes.iter().find(|n| graph.in_degree(n.id) > 1) {
      return Err(WorkflowError::MultiplePredecessors(node.node_id.clone()));
    }

    graph.topological_order()?;

    for chain in &self.chains {
      let mut reached = HashSet::new();
      let mut current = Some(chain.start);
      while let Some(id) = current {
        reached.insert(id);
        current = self.nodes[id.0].next;
      }
      if let Some(orphan) = chain.members.iter().find(|id| !reached.contains(*id)) {
        return Err(WorkflowError::UnreachableNode(
          self.nodes[orphan.0].node_id.clone(),
        ));
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use sluice_config::{ChainDef, NodeDef};
  use sluice_document::DocumentPath;

  use super::*;

  fn path(s: &str) -> DocumentPath {
    s.parse().unwrap()
  }

  fn linked(nodes: &[(&str, Option<&str>)]) -> Vec<NodeDef> {
    nodes
      .iter()
      .map(|(id, next)| {
        let mut node = NodeDef::pass(*id);
        node.next = next.map(str::to_string);
        node
      })
      .collect()
  }

  fn def(start: &str, nodes: Vec<NodeDef>) -> WorkflowDef {
    WorkflowDef {
      workflow_id: "wf".into(),
      name: "Test".into(),
      timeout_ms: None,
      start_at: start.into(),
      nodes,
    }
  }

  #[test]
  fn test_resolve_linear_chain() {
    let chain = ChainDef::start(NodeDef::pass("a"))
      .next(NodeDef::task("b", "double-number"))
      .next(NodeDef::pass("c"));
    let workflow = resolve(WorkflowDef::new("wf", "Test", chain)).unwrap();

    let order: Vec<_> = workflow
      .chain(workflow.start())
      .map(|n| n.node_id.as_str())
      .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    assert_eq!(
      workflow.task_functions().collect::<Vec<_>>(),
      vec![("b", "double-number")]
    );
  }

  #[test]
  fn test_nested_chains_share_the_arena() {
    let iterator = ChainDef::start(NodeDef::task("double", "double-number"));
    let branch_a = ChainDef::start(NodeDef::map("map_a", path("$.numLst"), iterator));
    let branch_b = ChainDef::start(NodeDef::pass("shape_b"));

    let chain = ChainDef::start(NodeDef::pass("start"))
      .next(NodeDef::parallel("fan_out", vec![branch_a, branch_b]))
      .next(NodeDef::pass("end"));
    let workflow = resolve(WorkflowDef::new("wf", "Test", chain)).unwrap();

    assert_eq!(workflow.nodes().len(), 6);
    let fan_out = workflow.get_node("fan_out").unwrap();
    let NodeKind::Parallel { branches } = &fan_out.kind else {
      panic!("expected parallel");
    };
    let first: Vec<_> = branches
      .iter()
      .map(|id| workflow.node(*id).node_id.as_str())
      .collect();
    assert_eq!(first, vec!["map_a", "shape_b"]);

    let NodeKind::Map { iterator, .. } = &workflow.get_node("map_a").unwrap().kind else {
      panic!("expected map");
    };
    assert_eq!(workflow.node(*iterator).node_id, "double");
    assert_eq!(fan_out.next, workflow.get_node("end").map(|n| n.id));
  }

  #[test]
  fn test_duplicate_node_id() {
    let result = resolve(def("a", linked(&[("a", Some("b")), ("b", None), ("b", None)])));
    assert_eq!(result.unwrap_err(), WorkflowError::DuplicateNodeId("b".into()));
  }

  #[test]
  fn test_duplicate_across_nested_chain() {
    let iterator = ChainDef::start(NodeDef::pass("a"));
    let chain = ChainDef::start(NodeDef::pass("a")).next(NodeDef::map("m", path("$.l"), iterator));
    let result = resolve(WorkflowDef::new("wf", "Test", chain));
    assert_eq!(result.unwrap_err(), WorkflowError::DuplicateNodeId("a".into()));
  }

  #[test]
  fn test_unknown_next() {
    let result = resolve(def("a", linked(&[("a", Some("missing"))])));
    assert!(matches!(result, Err(WorkflowError::InvalidEdge { .. })));
  }

  #[test]
  fn test_unknown_start() {
    let result = resolve(def("nope", linked(&[("a", None)])));
    assert_eq!(result.unwrap_err(), WorkflowError::NodeNotFound("nope".into()));
  }

  #[test]
  fn test_cycle_detected() {
    let result = resolve(def("a", linked(&[("a", Some("b")), ("b", Some("a"))])));
    assert_eq!(result.unwrap_err(), WorkflowError::CycleDetected);
  }

  #[test]
  fn test_self_loop_detected() {
    let result = resolve(def("a", linked(&[("a", Some("a"))])));
    assert_eq!(result.unwrap_err(), WorkflowError::CycleDetected);
  }

  #[test]
  fn test_orphan_node() {
    let result = resolve(def("a", linked(&[("a", Some("b")), ("b", None), ("c", None)])));
    assert_eq!(result.unwrap_err(), WorkflowError::UnreachableNode("c".into()));
  }

  #[test]
  fn test_join_is_rejected() {
    let nodes = linked(&[("a", Some("c")), ("b", Some("c")), ("c", None)]);
    let result = resolve(def("a", nodes));
    assert_eq!(result.unwrap_err(), WorkflowError::MultiplePredecessors("c".into()));
  }

  #[test]
  fn test_edge_out_of_branch() {
    let mut inner = NodeDef::pass("inner");
    inner.next = Some("outer_end".into());
    let branch = ChainDef::start(inner);
    let chain = ChainDef::start(NodeDef::parallel("p", vec![branch])).next(NodeDef::pass("outer_end"));

    let result = resolve(WorkflowDef::new("wf", "Test", chain));
    assert!(matches!(result, Err(WorkflowError::CrossChainEdge { .. })));
  }

  #[test]
  fn test_parallel_without_branches() {
    let result = resolve(WorkflowDef::new(
      "wf",
      "Test",
      ChainDef::start(NodeDef::parallel("p", vec![])),
    ));
    assert_eq!(result.unwrap_err(), WorkflowError::NoBranches("p".into()));
  }

  #[test]
  fn test_resolve_from_json() {
    let def: WorkflowDef = serde_json::from_value(json!({
      "workflow_id": "wf",
      "name": "From JSON",
      "start_at": "shape",
      "nodes": [
        {"node_id": "shape", "type": "pass", "next": "map"},
        {
          "node_id": "map",
          "type": "map",
          "items_path": "$.items",
          "result_path": "$.out",
          "iterator": {"start_at": "t", "nodes": [{"node_id": "t", "type": "task", "function": "f"}]},
        },
      ],
    }))
    .unwrap();

    let workflow = resolve(def).unwrap();
    assert_eq!(workflow.nodes().len(), 3);
    assert_eq!(workflow.node(workflow.start()).node_id, "shape");
  }
}
