use crate::error::WorkflowError;
use crate::node::NodeId;

/// Adjacency view over the arena used for structural checks.
///
/// Edges are `next` links plus one edge from every Map/Parallel node to the
/// start of each chain it owns.
#[derive(Debug, Clone)]
pub(crate) struct Graph {
  adjacency: Vec<Vec<NodeId>>,
  incoming: Vec<usize>,
}

impl Graph {
  pub(crate) fn new(node_count: usize) -> Self {
    Self {
      adjacency: vec![Vec::new(); node_count],
      incoming: vec![0; node_count],
    }
  }

  pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId) {
    self.adjacency[from.0].push(to);
    self.incoming[to.0] += 1;
  }

  /// Number of edges pointing at `node`.
  pub(crate) fn in_degree(&self, node: NodeId) -> usize {
    self.incoming[node.0]
  }

  /// Order nodes so every edge points forward.
  ///
  /// Fails with [`WorkflowError::CycleDetected`] on a back edge.
  pub(crate) fn topological_order(&self) -> Result<Vec<NodeId>, WorkflowError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
      White,
      Gray,
      Black,
    }

    fn visit(
      node: NodeId,
      adjacency: &[Vec<NodeId>],
      color: &mut [Color],
      order: &mut Vec<NodeId>,
    ) -> Result<(), WorkflowError> {
      color[node.0] = Color::Gray;
      for &next in &adjacency[node.0] {
        match color[next.0] {
          Color::Gray => return Err(WorkflowError::CycleDetected),
          Color::White => visit(next, adjacency, color, order)?,
          Color::Black => {}
        }
      }
      color[node.0] = Color::Black;
      order.push(node);
      Ok(())
    }

    let mut color = vec![Color::White; self.adjacency.len()];
    let mut order = Vec::with_capacity(self.adjacency.len());

    for idx in 0..self.adjacency.len() {
      if color[idx] == Color::White {
        visit(NodeId(idx), &self.adjacency, &mut color, &mut order)?;
      }
    }

    order.reverse();
    Ok(order)
  }
}
