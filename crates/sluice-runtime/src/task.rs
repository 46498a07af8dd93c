//! External task collaborators.
//!
//! A task receives `{"input": <selected sub-document>}` and returns a
//! document, or a tagged attribute fragment when the node asks for one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sluice_document::Document;

/// Error raised by a task collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
  /// The task ran and reported failure.
  #[error("{0}")]
  Failed(String),

  /// The task could not be reached.
  #[error("transport error: {0}")]
  Transport(String),

  /// The task replied with something that is not a document.
  #[error("invalid response: {0}")]
  InvalidResponse(String),
}

/// A function the workflow can call from a `task` node.
#[async_trait]
pub trait TaskHandler: Send + Sync {
  async fn invoke(&self, payload: Document) -> Result<Document, TaskError>;
}

/// Adapts a synchronous closure into a [`TaskHandler`].
pub struct FnTask<F>(F);

impl<F> FnTask<F>
where
  F: Fn(Document) -> Result<Document, TaskError> + Send + Sync,
{
  pub fn new(f: F) -> Self {
    FnTask(f)
  }
}

#[async_trait]
impl<F> TaskHandler for FnTask<F>
where
  F: Fn(Document) -> Result<Document, TaskError> + Send + Sync,
{
  async fn invoke(&self, payload: Document) -> Result<Document, TaskError> {
    (self.0)(payload)
  }
}

/// Named task handlers available to a runtime.
#[derive(Clone, Default)]
pub struct TaskRegistry {
  handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
    self.handlers.insert(name.into(), handler);
  }

  /// Builder form of [`register`](Self::register).
  pub fn with(mut self, name: impl Into<String>, handler: impl TaskHandler + 'static) -> Self {
    self.register(name, Arc::new(handler));
    self
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
    self.handlers.get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.handlers.contains_key(name)
  }
}

impl fmt::Debug for TaskRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<_> = self.handlers.keys().collect();
    names.sort();
    f.debug_struct("TaskRegistry").field("handlers", &names).finish()
  }
}
