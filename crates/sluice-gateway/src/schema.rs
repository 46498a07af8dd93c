//! Required-field validation of inbound documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use sluice_document::Document;

/// Primitive type constraint on a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
  String,
  Number,
  Boolean,
  List,
  Map,
}

impl FieldType {
  fn matches(self, value: &Document) -> bool {
    matches!(
      (self, value),
      (FieldType::String, Document::String(_))
        | (FieldType::Number, Document::Number(_))
        | (FieldType::Boolean, Document::Bool(_))
        | (FieldType::List, Document::List(_) | Document::Set(_))
        | (FieldType::Map, Document::Map(_))
    )
  }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      FieldType::String => "string",
      FieldType::Number => "number",
      FieldType::Boolean => "boolean",
      FieldType::List => "list",
      FieldType::Map => "map",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredField {
  pub name: String,
  /// `None` only requires presence.
  #[serde(default, rename = "type")]
  pub field_type: Option<FieldType>,
}

/// Why a request was rejected before execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("request body is not valid JSON: {message}")]
  Malformed { message: String },

  #[error("request body must be an object, found {found}")]
  NotAnObject { found: &'static str },

  #[error("missing required field '{0}'")]
  MissingField(String),

  #[error("field '{field}' must be a {expected}, found {found}")]
  WrongType {
    field: String,
    expected: FieldType,
    found: &'static str,
  },
}

/// The required fields of one entrypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSchema {
  #[serde(default)]
  pub required: Vec<RequiredField>,
}

impl InputSchema {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn require(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
    self.required.push(RequiredField {
      name: name.into(),
      field_type: Some(field_type),
    });
    self
  }

  /// Read the subset of JSON Schema this gateway understands: the
  /// `required` list, typed through `properties.<name>.type`.
  ///
  /// `integer` is treated as `number`; unknown or absent types only require
  /// presence.
  pub fn from_json_schema(json_schema: &serde_json::Value) -> Self {
    let properties = json_schema.get("properties").and_then(|p| p.as_object());

    let required = json_schema
      .get("required")
      .and_then(|r| r.as_array())
      .into_iter()
      .flatten()
      .filter_map(|name| name.as_str())
      .map(|name| {
        let field_type = properties
          .and_then(|props| props.get(name))
          .and_then(|prop| prop.get("type"))
          .and_then(|t| t.as_str())
          .and_then(|type_str| match type_str {
            "string" => Some(FieldType::String),
            "number" | "integer" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "array" => Some(FieldType::List),
            "object" => Some(FieldType::Map),
            _ => None,
          });
        RequiredField {
          name: name.to_string(),
          field_type,
        }
      })
      .collect();

    Self { required }
  }

  /// Check `doc` field by field, stopping at the first violation.
  ///
  /// A `null` value counts as missing.
  pub fn validate(&self, doc: &Document) -> Result<(), ValidationError> {
    let Document::Map(fields) = doc else {
      return Err(ValidationError::NotAnObject {
        found: doc.type_name(),
      });
    };

    for field in &self.required {
      let value = match fields.get(&field.name) {
        Some(value) if !value.is_null() => value,
        _ => return Err(ValidationError::MissingField(field.name.clone())),
      };

      if let Some(expected) = field.field_type {
        if !expected.matches(value) {
          return Err(ValidationError::WrongType {
            field: field.name.clone(),
            expected,
            found: value.type_name(),
          });
        }
      }
    }

    Ok(())
  }
}
