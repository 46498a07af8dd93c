//! Workflow runtime.
//!
//! The [`Runtime`] struct is the main entry point for executing workflows.
//! It owns a resolved workflow, the task registry and the record store, and
//! provides `invoke(input, cancel)` to run the document through the graph.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use sluice_codec::decode_fragment;
use sluice_document::{Document, PathError};
use sluice_store::RecordStore;
use sluice_workflow::{Node, NodeId, NodeKind, ResultFormat, ResultPath, Workflow};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{NodeError, RuntimeError};
use crate::result::ExecutionResult;
use crate::service;
use crate::task::TaskRegistry;

/// Execution ceiling used when neither the workflow nor the config sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Wall-clock ceiling for one execution. A workflow's own `timeout_ms`
  /// takes precedence.
  pub timeout: Duration,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      timeout: DEFAULT_TIMEOUT,
    }
  }
}

/// The workflow runtime.
///
/// Shared read-only between concurrent executions; each `invoke` works on its
/// own document.
pub struct Runtime {
  workflow: Arc<Workflow>,
  tasks: Arc<TaskRegistry>,
  store: Arc<dyn RecordStore>,
  timeout: Duration,
}

/// State shared by every chain of one execution.
struct Execution {
  execution_id: String,
  workflow: Arc<Workflow>,
  tasks: Arc<TaskRegistry>,
  store: Arc<dyn RecordStore>,
}

impl Runtime {
  /// Create a new runtime for the given workflow.
  ///
  /// Fails with [`RuntimeError::InvalidDefinition`] when a task node names a
  /// function the registry does not have.
  pub fn new(
    workflow: impl Into<Arc<Workflow>>,
    tasks: TaskRegistry,
    store: Arc<dyn RecordStore>,
    config: RuntimeConfig,
  ) -> Result<Self, RuntimeError> {
    let workflow = workflow.into();

    let missing: Vec<String> = workflow
      .task_functions()
      .filter(|(_, function)| !tasks.contains(function))
      .map(|(node_id, function)| format!("'{}' (node '{}')", function, node_id))
      .collect();
    if !missing.is_empty() {
      return Err(RuntimeError::InvalidDefinition {
        message: format!("unregistered task functions: {}", missing.join(", ")),
      });
    }

    let timeout = workflow
      .timeout_ms
      .map(Duration::from_millis)
      .unwrap_or(config.timeout);

    Ok(Self {
      workflow,
      tasks: Arc::new(tasks),
      store,
      timeout,
    })
  }

  /// Get a reference to the workflow.
  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }

  /// The effective execution ceiling.
  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// Execute the workflow with the given input document.
  #[instrument(
    name = "runtime_invoke",
    skip(self, input, cancel),
    fields(
      workflow_id = %self.workflow.workflow_id,
    )
  )]
  pub async fn invoke(
    &self,
    input: Document,
    cancel: CancellationToken,
  ) -> Result<ExecutionResult, RuntimeError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();

    info!(
      execution_id = %execution_id,
      workflow_id = %self.workflow.workflow_id,
      "workflow_started"
    );

    let execution = Arc::new(Execution {
      execution_id: execution_id.clone(),
      workflow: self.workflow.clone(),
      tasks: self.tasks.clone(),
      store: self.store.clone(),
    });

    let exec_cancel = cancel.child_token();
    let run = run_chain(execution, self.workflow.start(), input, exec_cancel.clone());

    let result = tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(RuntimeError::Cancelled),
      outcome = tokio::time::timeout(self.timeout, run) => match outcome {
        Ok(result) => result,
        Err(_) => {
          warn!(execution_id = %execution_id, "execution timed out");
          Err(RuntimeError::Timeout {
            timeout_ms: self.timeout.as_millis() as u64,
          })
        }
      },
    };

    // Anything still running in a fan-out observes this and stops.
    exec_cancel.cancel();

    match result {
      Ok(output) => {
        let result = ExecutionResult {
          execution_id,
          workflow_id: self.workflow.workflow_id.clone(),
          output,
          started_at,
          completed_at: Utc::now(),
        };
        info!(
          execution_id = %result.execution_id,
          duration_ms = result.duration_ms(),
          "workflow_completed"
        );
        Ok(result)
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "workflow_failed");
        Err(e)
      }
    }
  }
}

/// Run one chain from `start` to its end, threading the document through.
fn run_chain(
  execution: Arc<Execution>,
  start: NodeId,
  doc: Document,
  cancel: CancellationToken,
) -> BoxFuture<'static, Result<Document, RuntimeError>> {
  async move {
    let mut doc = doc;
    let mut current = Some(start);

    while let Some(id) = current {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution.execution_id, "execution cancelled");
        return Err(RuntimeError::Cancelled);
      }

      let node = execution.workflow.node(id);
      doc = run_node(&execution, node, doc, &cancel).await?;
      current = node.next;
    }

    Ok(doc)
  }
  .boxed()
}

#[instrument(
  name = "run_node",
  skip_all,
  fields(
    execution_id = %execution.execution_id,
    node_id = %node.node_id,
  )
)]
async fn run_node(
  execution: &Arc<Execution>,
  node: &Node,
  doc: Document,
  cancel: &CancellationToken,
) -> Result<Document, RuntimeError> {
  info!(
    execution_id = %execution.execution_id,
    node_id = %node.node_id,
    kind = node.kind.name(),
    "node_started"
  );

  let result = execute_node(execution, node, doc, cancel).await;
  match &result {
    Ok(_) => {
      info!(
        execution_id = %execution.execution_id,
        node_id = %node.node_id,
        "node_completed"
      );
    }
    Err(RuntimeError::NodeFailed { source, .. }) => {
      error!(
        execution_id = %execution.execution_id,
        node_id = %node.node_id,
        error = %source,
        "node_failed"
      );
    }
    Err(_) => {}
  }
  result
}

async fn execute_node(
  execution: &Arc<Execution>,
  node: &Node,
  doc: Document,
  cancel: &CancellationToken,
) -> Result<Document, RuntimeError> {
  let failed = |source: NodeError| RuntimeError::NodeFailed {
    node_id: node.node_id.clone(),
    source,
  };

  let input = node
    .input_path
    .select(&doc)
    .map_err(|e| failed(e.into()))?
    .clone();

  let result = match &node.kind {
    NodeKind::Pass { parameters, result } => match (result, parameters) {
      (Some(result), _) => result.clone(),
      (None, Some(parameters)) => parameters
        .iter()
        .map(|(name, param)| Ok((name.clone(), param.resolve(&input)?)))
        .collect::<Result<Document, PathError>>()
        .map_err(|e| failed(e.into()))?,
      (None, None) => input,
    },

    NodeKind::Task {
      function,
      result_format,
    } => {
      let handler = execution
        .tasks
        .get(function)
        .ok_or_else(|| RuntimeError::InvalidDefinition {
          message: format!("task function '{}' is not registered", function),
        })?;

      let payload: Document = [("input".to_string(), input)].into_iter().collect();
      let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
        output = handler.invoke(payload) => output.map_err(|source| {
          failed(NodeError::Task {
            function: function.clone(),
            source,
          })
        })?,
      };

      match result_format {
        ResultFormat::Document => output,
        ResultFormat::Attribute => decode_fragment(&output).map_err(|e| failed(e.into()))?,
      }
    }

    NodeKind::Map {
      items_path,
      iterator,
      max_concurrency,
    } => {
      let items = match items_path.select(&input).map_err(|e| failed(e.into()))? {
        Document::List(items) | Document::Set(items) => items.clone(),
        other => {
          return Err(failed(NodeError::InvalidInput {
            message: format!("map items must be a list, found {}", other.type_name()),
          }));
        }
      };

      let chains = items.into_iter().map(|item| (*iterator, item));
      let results = fan_out(execution, chains, *max_concurrency, cancel, |index, source| {
        RuntimeError::ElementFailed {
          node_id: node.node_id.clone(),
          index,
          source: Box::new(source),
        }
      })
      .await?;
      Document::List(results)
    }

    NodeKind::Parallel { branches } => {
      let chains = branches.iter().map(|start| (*start, input.clone()));
      let results = fan_out(execution, chains, 0, cancel, |branch, source| {
        RuntimeError::BranchFailed {
          node_id: node.node_id.clone(),
          branch,
          source: Box::new(source),
        }
      })
      .await?;
      Document::List(results)
    }

    NodeKind::ServiceCall(call) => service::execute(execution.store.as_ref(), call, &input)
      .await
      .map_err(failed)?,
  };

  let result = match &node.output_path {
    Some(path) => path.select(&result).map_err(|e| failed(e.into()))?.clone(),
    None => result,
  };

  merge(doc, &node.result_path, result).map_err(|e| failed(e.into()))
}

/// Place a node's result into the document it was given.
fn merge(mut doc: Document, result_path: &ResultPath, result: Document) -> Result<Document, PathError> {
  match result_path {
    ResultPath::ReplaceRoot => Ok(result),
    ResultPath::MergeAt(path) => {
      path.set(&mut doc, result)?;
      Ok(doc)
    }
    ResultPath::Discard => Ok(doc),
  }
}

/// Run chains concurrently and collect their documents in input order.
///
/// `limit` bounds how many chains run at once; zero means unbounded. The
/// first failure cancels and aborts the remaining chains.
async fn fan_out(
  execution: &Arc<Execution>,
  chains: impl Iterator<Item = (NodeId, Document)>,
  limit: usize,
  cancel: &CancellationToken,
  wrap: impl Fn(usize, RuntimeError) -> RuntimeError,
) -> Result<Vec<Document>, RuntimeError> {
  let cancel = cancel.child_token();
  let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));

  let mut set = JoinSet::new();
  let mut count = 0;
  for (index, (start, doc)) in chains.enumerate() {
    let execution = execution.clone();
    let cancel = cancel.clone();
    let semaphore = semaphore.clone();

    set.spawn(async move {
      let _permit = match semaphore {
        Some(semaphore) => match semaphore.acquire_owned().await {
          Ok(permit) => Some(permit),
          Err(_) => return (index, Err(RuntimeError::Cancelled)),
        },
        None => None,
      };
      (index, run_chain(execution, start, doc, cancel).await)
    });
    count += 1;
  }

  let mut slots: Vec<Option<Document>> = (0..count).map(|_| None).collect();
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok((index, Ok(doc))) => slots[index] = Some(doc),
      Ok((index, Err(e))) => {
        cancel.cancel();
        set.abort_all();
        return Err(wrap(index, e));
      }
      Err(e) => {
        cancel.cancel();
        set.abort_all();
        return Err(RuntimeError::Join {
          message: e.to_string(),
        });
      }
    }
  }

  Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
}
