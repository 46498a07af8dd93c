use serde::{Deserialize, Serialize};
use sluice_document::{Document, DocumentPath, PathError};

/// A value taken either from the current document or from the definition.
///
/// ```json
/// {"path": "$.pk"}
/// {"value": 5}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
  Path { path: DocumentPath },
  Value { value: Document },
}

impl Parameter {
  pub fn path(path: DocumentPath) -> Self {
    Parameter::Path { path }
  }

  pub fn value(value: impl Into<Document>) -> Self {
    Parameter::Value {
      value: value.into(),
    }
  }

  /// Resolve against `doc`.
  pub fn resolve(&self, doc: &Document) -> Result<Document, PathError> {
    match self {
      Parameter::Path { path } => path.select(doc).cloned(),
      Parameter::Value { value } => Ok(value.clone()),
    }
  }
}
