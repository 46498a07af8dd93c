use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sluice_document::Number;

use crate::error::CodecError;

/// A typed, storage-oriented value.
///
/// Serializes to the single-key tagged form used by key-value stores,
/// e.g. `{"S": "hello"}`, `{"N": "4.5"}`, `{"SS": ["a", "b"]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Wire", into = "Wire")]
pub enum AttributeValue {
  Null,
  Str(String),
  /// Exact decimal text.
  Num(Number),
  Bool(bool),
  Binary(Bytes),
  List(Vec<AttributeValue>),
  /// Deduplicated, unordered strings.
  StringSet(Vec<String>),
  Map(IndexMap<String, AttributeValue>),
}

impl AttributeValue {
  /// The wire tag for this value (`S`, `N`, `BOOL`, ...).
  pub fn tag(&self) -> &'static str {
    match self {
      AttributeValue::Null => "NULL",
      AttributeValue::Str(_) => "S",
      AttributeValue::Num(_) => "N",
      AttributeValue::Bool(_) => "BOOL",
      AttributeValue::Binary(_) => "B",
      AttributeValue::List(_) => "L",
      AttributeValue::StringSet(_) => "SS",
      AttributeValue::Map(_) => "M",
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      AttributeValue::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<&Number> {
    match self {
      AttributeValue::Num(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_string_set(&self) -> Option<&[String]> {
    match self {
      AttributeValue::StringSet(items) => Some(items),
      _ => None,
    }
  }
}

impl PartialEq for AttributeValue {
  fn eq(&self, other: &Self) -> bool {
    use AttributeValue::*;
    match (self, other) {
      (Null, Null) => true,
      (Str(a), Str(b)) => a == b,
      (Num(a), Num(b)) => a == b,
      (Bool(a), Bool(b)) => a == b,
      (Binary(a), Binary(b)) => a == b,
      (List(a), List(b)) => a == b,
      (StringSet(a), StringSet(b)) => {
        a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
      }
      (Map(a), Map(b)) => a == b,
      _ => false,
    }
  }
}

#[derive(Serialize, Deserialize)]
enum Wire {
  #[serde(rename = "NULL")]
  Null(bool),
  #[serde(rename = "S")]
  Str(String),
  #[serde(rename = "N")]
  Num(String),
  #[serde(rename = "BOOL")]
  Bool(bool),
  #[serde(rename = "B")]
  Binary(String),
  #[serde(rename = "L")]
  List(Vec<AttributeValue>),
  #[serde(rename = "SS")]
  StringSet(Vec<String>),
  #[serde(rename = "M")]
  Map(IndexMap<String, AttributeValue>),
}

impl TryFrom<Wire> for AttributeValue {
  type Error = CodecError;

  fn try_from(wire: Wire) -> Result<Self, Self::Error> {
    Ok(match wire {
      Wire::Null(_) => AttributeValue::Null,
      Wire::Str(s) => AttributeValue::Str(s),
      Wire::Num(n) => {
        AttributeValue::Num(n.parse().map_err(|e| CodecError::MalformedFragment {
          message: format!("{}", e),
        })?)
      }
      Wire::Bool(b) => AttributeValue::Bool(b),
      Wire::Binary(b64) => {
        let raw = STANDARD
          .decode(b64.as_bytes())
          .map_err(|e| CodecError::MalformedFragment {
            message: format!("invalid base64 in B attribute: {}", e),
          })?;
        AttributeValue::Binary(Bytes::from(raw))
      }
      Wire::List(items) => AttributeValue::List(items),
      Wire::StringSet(items) => {
        let mut unique: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
          if !unique.contains(&item) {
            unique.push(item);
          }
        }
        AttributeValue::StringSet(unique)
      }
      Wire::Map(map) => AttributeValue::Map(map),
    })
  }
}

impl From<AttributeValue> for Wire {
  fn from(value: AttributeValue) -> Self {
    match value {
      AttributeValue::Null => Wire::Null(true),
      AttributeValue::Str(s) => Wire::Str(s),
      AttributeValue::Num(n) => Wire::Num(n.as_str().to_string()),
      AttributeValue::Bool(b) => Wire::Bool(b),
      AttributeValue::Binary(bytes) => Wire::Binary(STANDARD.encode(&bytes)),
      AttributeValue::List(items) => Wire::List(items),
      AttributeValue::StringSet(items) => Wire::StringSet(items),
      AttributeValue::Map(map) => Wire::Map(map),
    }
  }
}
