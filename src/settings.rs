use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sluice_gateway::{InputSchema, ResponseConfig};
use sluice_store::{KeyAttribute, TableSchema};

/// Contents of the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_table")]
  pub table: TableSchema,
  /// Execution ceiling, unless the workflow sets its own.
  #[serde(default)]
  pub timeout_ms: Option<u64>,
  /// JSON Schema of the request body. Only `required` and
  /// `properties.*.type` are used.
  #[serde(default)]
  pub input_schema: Option<serde_json::Value>,
  #[serde(default)]
  pub response: ResponseConfig,
  /// Task name to HTTP endpoint.
  #[serde(default)]
  pub tasks: HashMap<String, String>,
  #[serde(default)]
  pub store: StoreSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
  /// Make updates of missing records fail instead of creating them.
  #[serde(default)]
  pub require_existing: bool,
  /// Attempts per store call, including the first.
  #[serde(default)]
  pub max_attempts: Option<u32>,
}

fn default_table() -> TableSchema {
  TableSchema::new("sluice", KeyAttribute::string("pk"))
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      table: default_table(),
      timeout_ms: None,
      input_schema: None,
      response: ResponseConfig::default(),
      tasks: HashMap::new(),
      store: StoreSettings::default(),
    }
  }
}

impl Settings {
  /// Load settings from `path`.
  ///
  /// A missing file is only an error when `required` is set, so the default
  /// location can be absent.
  pub fn load(path: &Path, required: bool) -> Result<Self> {
    if !path.exists() && !required {
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read settings file: {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse settings file: {}", path.display()))
  }

  pub fn input_schema(&self) -> InputSchema {
    self
      .input_schema
      .as_ref()
      .map(InputSchema::from_json_schema)
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use sluice_gateway::FieldType;

  use super::*;

  #[test]
  fn test_missing_default_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("config.json"), false).unwrap();

    assert_eq!(settings.table.table_name, "sluice");
    assert!(settings.tasks.is_empty());
    assert!(settings.input_schema().required.is_empty());
  }

  #[test]
  fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Settings::load(&dir.path().join("config.json"), true).is_err());
  }

  #[test]
  fn test_load_full_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
      file,
      r#"{{
        "table": {{
          "table_name": "orders",
          "partition_key": {{"name": "customer", "type": "S"}},
          "sort_key": {{"name": "order", "type": "N"}}
        }},
        "timeout_ms": 5000,
        "input_schema": {{"required": ["text"], "properties": {{"text": {{"type": "string"}}}}}},
        "response": {{"path": "$.translated", "wrap_key": "body"}},
        "tasks": {{"translate": "http://localhost:9000/translate"}},
        "store": {{"require_existing": true, "max_attempts": 5}}
      }}"#
    )
    .unwrap();

    let settings = Settings::load(file.path(), true).unwrap();
    assert_eq!(settings.table.table_name, "orders");
    assert_eq!(settings.table.sort_key, Some(KeyAttribute::number("order")));
    assert_eq!(settings.timeout_ms, Some(5000));
    assert_eq!(settings.response.wrap_key.as_deref(), Some("body"));
    assert_eq!(settings.tasks["translate"], "http://localhost:9000/translate");
    assert!(settings.store.require_existing);
    assert_eq!(settings.store.max_attempts, Some(5));
    assert_eq!(
      settings.input_schema().required[0].field_type,
      Some(FieldType::String)
    );
  }
}
