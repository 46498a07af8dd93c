use chrono::{DateTime, Utc};
use serde::Serialize;
use sluice_document::Document;

/// Outcome of a successful workflow execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
  pub execution_id: String,
  pub workflow_id: String,
  /// The final document.
  pub output: Document,
  pub started_at: DateTime<Utc>,
  pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
  pub fn duration_ms(&self) -> i64 {
    (self.completed_at - self.started_at).num_milliseconds()
  }
}
