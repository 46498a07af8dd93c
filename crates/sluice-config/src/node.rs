use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sluice_document::{Document, DocumentPath};

use crate::parameter::Parameter;
use crate::service::ServiceCall;
use crate::workflow::ChainDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub node_id: String,
  #[serde(flatten)]
  pub node_type: NodeType,
  /// Selects the sub-document the node operates on.
  #[serde(default, skip_serializing_if = "DocumentPath::is_root")]
  pub input_path: DocumentPath,
  /// Where the node's result is written back.
  #[serde(default, skip_serializing_if = "ResultPath::is_replace_root")]
  pub result_path: ResultPath,
  /// Selects part of the raw result before it is written back.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_path: Option<DocumentPath>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeType {
  /// Pass the input through, optionally reshaped.
  Pass {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<IndexMap<String, Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Document>,
  },
  /// Invoke a registered task function.
  Task {
    function: String,
    #[serde(default)]
    result_format: ResultFormat,
  },
  /// Run `iterator` once per element of the list at `items_path`.
  Map {
    #[serde(default)]
    items_path: DocumentPath,
    iterator: ChainDef,
    /// 0 means unbounded.
    #[serde(default)]
    max_concurrency: usize,
  },
  /// Run every branch against the same input.
  Parallel { branches: Vec<ChainDef> },
  ServiceCall(ServiceCall),
}

/// How a task's return value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFormat {
  #[default]
  Document,
  /// The task returns a tagged attribute fragment.
  Attribute,
}

/// Merge policy for a node's result.
///
/// In JSON this is a path string (`"$"` replaces the whole document) or
/// `null` to discard the result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultPath {
  #[default]
  ReplaceRoot,
  MergeAt(DocumentPath),
  Discard,
}

impl ResultPath {
  pub fn is_replace_root(&self) -> bool {
    matches!(self, ResultPath::ReplaceRoot)
  }
}

impl Serialize for ResultPath {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      ResultPath::ReplaceRoot => DocumentPath::root().serialize(serializer),
      ResultPath::MergeAt(path) => path.serialize(serializer),
      ResultPath::Discard => serializer.serialize_none(),
    }
  }
}

impl<'de> Deserialize<'de> for ResultPath {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Ok(match Option::<DocumentPath>::deserialize(deserializer)? {
      None => ResultPath::Discard,
      Some(path) if path.is_root() => ResultPath::ReplaceRoot,
      Some(path) => ResultPath::MergeAt(path),
    })
  }
}

impl NodeDef {
  fn with_type(node_id: impl Into<String>, node_type: NodeType) -> Self {
    NodeDef {
      node_id: node_id.into(),
      node_type,
      input_path: DocumentPath::root(),
      result_path: ResultPath::ReplaceRoot,
      output_path: None,
      next: None,
    }
  }

  pub fn pass(node_id: impl Into<String>) -> Self {
    Self::with_type(
      node_id,
      NodeType::Pass {
        parameters: None,
        result: None,
      },
    )
  }

  pub fn task(node_id: impl Into<String>, function: impl Into<String>) -> Self {
    Self::with_type(
      node_id,
      NodeType::Task {
        function: function.into(),
        result_format: ResultFormat::Document,
      },
    )
  }

  pub fn map(node_id: impl Into<String>, items_path: DocumentPath, iterator: ChainDef) -> Self {
    Self::with_type(
      node_id,
      NodeType::Map {
        items_path,
        iterator,
        max_concurrency: 0,
      },
    )
  }

  pub fn parallel(node_id: impl Into<String>, branches: Vec<ChainDef>) -> Self {
    Self::with_type(node_id, NodeType::Parallel { branches })
  }

  pub fn service_call(node_id: impl Into<String>, call: ServiceCall) -> Self {
    Self::with_type(node_id, NodeType::ServiceCall(call))
  }

  pub fn with_input_path(mut self, path: DocumentPath) -> Self {
    self.input_path = path;
    self
  }

  pub fn with_result_path(mut self, result_path: ResultPath) -> Self {
    self.result_path = result_path;
    self
  }

  pub fn with_output_path(mut self, path: DocumentPath) -> Self {
    self.output_path = Some(path);
    self
  }

  /// Set the Pass node's parameters. No-op on other node types.
  pub fn with_parameters(mut self, params: IndexMap<String, Parameter>) -> Self {
    if let NodeType::Pass { parameters, .. } = &mut self.node_type {
      *parameters = Some(params);
    }
    self
  }

  /// Set a Task node's result format. No-op on other node types.
  pub fn with_result_format(mut self, format: ResultFormat) -> Self {
    if let NodeType::Task { result_format, .. } = &mut self.node_type {
      *result_format = format;
    }
    self
  }

  /// Set a Map node's concurrency bound. No-op on other node types.
  pub fn with_max_concurrency(mut self, limit: usize) -> Self {
    if let NodeType::Map {
      max_concurrency, ..
    } = &mut self.node_type
    {
      *max_concurrency = limit;
    }
    self
  }
}
