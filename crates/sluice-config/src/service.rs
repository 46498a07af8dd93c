use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sluice_codec::AttributeKind;

use crate::parameter::Parameter;

/// A persistence call made by a `service_call` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ServiceCall {
  /// Write a whole record, overwriting any record with the same key.
  Put { item: IndexMap<String, AttributeDef> },
  Get {
    key: KeyDef,
    /// Attributes to return. Empty returns the whole record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    projection: Vec<String>,
  },
  /// Apply attribute updates to a record.
  Update { key: KeyDef, updates: Vec<UpdateDef> },
  Delete { key: KeyDef },
  /// Fetch every record under one partition value.
  Query {
    partition: Parameter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    projection: Vec<String>,
  },
  /// Fetch every record in the table.
  Scan {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    projection: Vec<String>,
  },
}

/// One attribute of a record being written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
  #[serde(flatten)]
  pub source: Parameter,
  #[serde(rename = "as", default, skip_serializing_if = "is_auto")]
  pub kind: AttributeKind,
}

fn is_auto(kind: &AttributeKind) -> bool {
  *kind == AttributeKind::Auto
}

impl AttributeDef {
  pub fn new(source: Parameter) -> Self {
    AttributeDef {
      source,
      kind: AttributeKind::Auto,
    }
  }

  pub fn with_kind(mut self, kind: AttributeKind) -> Self {
    self.kind = kind;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDef {
  pub partition: Parameter,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sort: Option<Parameter>,
}

impl KeyDef {
  pub fn partition(partition: Parameter) -> Self {
    KeyDef {
      partition,
      sort: None,
    }
  }

  pub fn with_sort(mut self, sort: Parameter) -> Self {
    self.sort = Some(sort);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
  /// Overwrite the attribute.
  Set,
  /// Numeric increment or string set union. A missing attribute counts as
  /// zero or the empty set.
  Add,
  Remove,
}

/// A single attribute change within an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDef {
  pub attribute: String,
  pub action: UpdateAction,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub operand: Option<AttributeDef>,
}

impl UpdateDef {
  pub fn set(attribute: impl Into<String>, operand: AttributeDef) -> Self {
    UpdateDef {
      attribute: attribute.into(),
      action: UpdateAction::Set,
      operand: Some(operand),
    }
  }

  pub fn add(attribute: impl Into<String>, operand: AttributeDef) -> Self {
    UpdateDef {
      attribute: attribute.into(),
      action: UpdateAction::Add,
      operand: Some(operand),
    }
  }

  pub fn remove(attribute: impl Into<String>) -> Self {
    UpdateDef {
      attribute: attribute.into(),
      action: UpdateAction::Remove,
      operand: None,
    }
  }
}
