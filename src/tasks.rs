//! Built-in task functions available to every workflow run from the CLI.

use serde_json::json;
use sluice_document::{Document, Number};
use sluice_runtime::{FnTask, TaskError, TaskRegistry};

/// Registry holding the built-in tasks.
pub fn builtin() -> TaskRegistry {
  TaskRegistry::new()
    .with("double-number", FnTask::new(double_number))
    .with("to-attribute-map", FnTask::new(to_attribute_map))
}

fn input(payload: &Document) -> Result<&Document, TaskError> {
  payload
    .get("input")
    .ok_or_else(|| TaskError::Failed("payload has no input".into()))
}

fn number(doc: &Document, what: &str) -> Result<Number, TaskError> {
  doc
    .as_number()
    .cloned()
    .ok_or_else(|| TaskError::Failed(format!("{} must be a number, found {}", what, doc.type_name())))
}

fn doubled(n: &Number) -> Result<Number, TaskError> {
  n.checked_add(n).map_err(|e| TaskError::Failed(e.to_string()))
}

/// `n` → `2n`, exact for any decimal.
fn double_number(payload: Document) -> Result<Document, TaskError> {
  let n = number(input(&payload)?, "input")?;
  Ok(Document::Number(doubled(&n)?))
}

/// `{"num": n, "str": s}` → the attribute fragment of
/// `{"num": 2n, "str": s}`.
fn to_attribute_map(payload: Document) -> Result<Document, TaskError> {
  let input = input(&payload)?;
  let num = input
    .get("num")
    .ok_or_else(|| TaskError::Failed("input.num is required".into()))
    .and_then(|n| number(n, "input.num"))?;
  let text = input
    .get("str")
    .and_then(Document::as_str)
    .ok_or_else(|| TaskError::Failed("input.str must be a string".into()))?;

  Ok(Document::from(json!({
    "M": {
      "num": {"N": doubled(&num)?.to_string()},
      "str": {"S": text},
    }
  })))
}
