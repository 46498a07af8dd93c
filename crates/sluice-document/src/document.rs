use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::number::Number;

/// A nested value passed between workflow nodes.
///
/// Equality treats [`Document::Set`] as an unordered collection and ignores
/// key order in [`Document::Map`]. Map key order is still preserved for
/// iteration and serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Document {
  #[default]
  Null,
  Bool(bool),
  Number(Number),
  String(String),
  Binary(Bytes),
  List(Vec<Document>),
  Set(Vec<Document>),
  Map(IndexMap<String, Document>),
}

impl Document {
  /// An empty map.
  pub fn map() -> Self {
    Document::Map(IndexMap::new())
  }

  /// Short name of the value's shape, used in error messages.
  pub fn type_name(&self) -> &'static str {
    match self {
      Document::Null => "null",
      Document::Bool(_) => "boolean",
      Document::Number(_) => "number",
      Document::String(_) => "string",
      Document::Binary(_) => "binary",
      Document::List(_) => "list",
      Document::Set(_) => "set",
      Document::Map(_) => "map",
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Document::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Document::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<&Number> {
    match self {
      Document::Number(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Document::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// Elements of a list or set.
  pub fn as_items(&self) -> Option<&[Document]> {
    match self {
      Document::List(items) | Document::Set(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&IndexMap<String, Document>> {
    match self {
      Document::Map(map) => Some(map),
      _ => None,
    }
  }

  /// Look up a key if this is a map.
  pub fn get(&self, key: &str) -> Option<&Document> {
    self.as_map().and_then(|m| m.get(key))
  }
}

impl PartialEq for Document {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Document::Null, Document::Null) => true,
      (Document::Bool(a), Document::Bool(b)) => a == b,
      (Document::Number(a), Document::Number(b)) => a == b,
      (Document::String(a), Document::String(b)) => a == b,
      (Document::Binary(a), Document::Binary(b)) => a == b,
      (Document::List(a), Document::List(b)) => a == b,
      (Document::Set(a), Document::Set(b)) => {
        a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
      }
      (Document::Map(a), Document::Map(b)) => a == b,
      _ => false,
    }
  }
}

impl From<serde_json::Value> for Document {
  fn from(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Document::Null,
      serde_json::Value::Bool(b) => Document::Bool(b),
      // serde_json only produces valid literals
      serde_json::Value::Number(n) => match n.to_string().parse() {
        Ok(number) => Document::Number(number),
        Err(_) => Document::String(n.to_string()),
      },
      serde_json::Value::String(s) => Document::String(s),
      serde_json::Value::Array(items) => {
        Document::List(items.into_iter().map(Document::from).collect())
      }
      serde_json::Value::Object(map) => Document::Map(
        map
          .into_iter()
          .map(|(k, v)| (k, Document::from(v)))
          .collect(),
      ),
    }
  }
}

impl From<Document> for serde_json::Value {
  fn from(doc: Document) -> Self {
    match doc {
      Document::Null => serde_json::Value::Null,
      Document::Bool(b) => serde_json::Value::Bool(b),
      Document::Number(n) => match serde_json::from_str::<serde_json::Number>(n.as_str()) {
        Ok(number) => serde_json::Value::Number(number),
        Err(_) => serde_json::Value::String(n.to_string()),
      },
      Document::String(s) => serde_json::Value::String(s),
      Document::Binary(bytes) => serde_json::Value::String(STANDARD.encode(&bytes)),
      Document::List(items) | Document::Set(items) => {
        serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
      }
      Document::Map(map) => serde_json::Value::Object(
        map
          .into_iter()
          .map(|(k, v)| (k, serde_json::Value::from(v)))
          .collect(),
      ),
    }
  }
}

impl From<&str> for Document {
  fn from(value: &str) -> Self {
    Document::String(value.to_string())
  }
}

impl From<String> for Document {
  fn from(value: String) -> Self {
    Document::String(value)
  }
}

impl From<bool> for Document {
  fn from(value: bool) -> Self {
    Document::Bool(value)
  }
}

impl From<i64> for Document {
  fn from(value: i64) -> Self {
    Document::Number(Number::from(value))
  }
}

impl From<Number> for Document {
  fn from(value: Number) -> Self {
    Document::Number(value)
  }
}

impl From<Bytes> for Document {
  fn from(value: Bytes) -> Self {
    Document::Binary(value)
  }
}

impl From<Vec<Document>> for Document {
  fn from(value: Vec<Document>) -> Self {
    Document::List(value)
  }
}

impl From<IndexMap<String, Document>> for Document {
  fn from(value: IndexMap<String, Document>) -> Self {
    Document::Map(value)
  }
}

impl FromIterator<(String, Document)> for Document {
  fn from_iter<T: IntoIterator<Item = (String, Document)>>(iter: T) -> Self {
    Document::Map(iter.into_iter().collect())
  }
}
