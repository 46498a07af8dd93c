//! Typed projection of documents before encoding.
//!
//! JSON inputs carry no set or binary type, so persistence calls declare the
//! attribute kind they want and the document is coerced into that shape.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sluice_document::{Document, Number};

use crate::error::CodecError;

/// Target shape for an attribute written by a persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
  /// Keep the document's own shape.
  #[default]
  Auto,
  String,
  Number,
  Boolean,
  /// Base64 text becomes raw bytes.
  Binary,
  StringSet,
  List,
  Map,
}

/// Coerce `doc` into the requested attribute kind.
pub fn coerce(doc: Document, kind: AttributeKind) -> Result<Document, CodecError> {
  let mismatch = |doc: &Document| CodecError::TypeMismatch {
    message: format!("cannot use {} as {:?}", doc.type_name(), kind),
  };

  match (kind, doc) {
    (AttributeKind::Auto, doc) => Ok(doc),

    (AttributeKind::String, doc @ Document::String(_)) => Ok(doc),
    (AttributeKind::String, Document::Number(n)) => Ok(Document::String(n.to_string())),
    (AttributeKind::String, Document::Bool(b)) => Ok(Document::String(b.to_string())),

    (AttributeKind::Number, doc @ Document::Number(_)) => Ok(doc),
    (AttributeKind::Number, Document::String(s)) => s
      .parse::<Number>()
      .map(Document::Number)
      .map_err(|e| CodecError::TypeMismatch {
        message: e.to_string(),
      }),

    (AttributeKind::Boolean, doc @ Document::Bool(_)) => Ok(doc),
    (AttributeKind::Boolean, Document::String(s)) if s == "true" => Ok(Document::Bool(true)),
    (AttributeKind::Boolean, Document::String(s)) if s == "false" => Ok(Document::Bool(false)),

    (AttributeKind::Binary, doc @ Document::Binary(_)) => Ok(doc),
    (AttributeKind::Binary, Document::String(s)) => STANDARD
      .decode(s.as_bytes())
      .map(|raw| Document::Binary(Bytes::from(raw)))
      .map_err(|e| CodecError::TypeMismatch {
        message: format!("invalid base64 for binary attribute: {}", e),
      }),

    (AttributeKind::StringSet, doc @ Document::Set(_)) => Ok(doc),
    (AttributeKind::StringSet, Document::List(items)) => Ok(Document::Set(items)),

    (AttributeKind::List, doc @ Document::List(_)) => Ok(doc),
    (AttributeKind::List, Document::Set(items)) => Ok(Document::List(items)),

    (AttributeKind::Map, doc @ Document::Map(_)) => Ok(doc),

    (_, doc) => Err(mismatch(&doc)),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::codec::encode;

  #[test]
  fn test_list_to_string_set_then_encode_dedupes() {
    let list = Document::from(json!(["p", "p", "q"]));
    let set = coerce(list, AttributeKind::StringSet).unwrap();
    let encoded = encode(&set).unwrap();
    assert_eq!(encoded.as_string_set().unwrap().len(), 2);
  }

  #[test]
  fn test_base64_string_to_binary() {
    let bin = coerce(Document::from("AQID"), AttributeKind::Binary).unwrap();
    assert_eq!(bin, Document::Binary(Bytes::from_static(&[1, 2, 3])));
  }

  #[test]
  fn test_number_from_string() {
    let n = coerce(Document::from("3.50"), AttributeKind::Number).unwrap();
    assert_eq!(n.as_number().unwrap().as_str(), "3.50");
    assert!(coerce(Document::from("x"), AttributeKind::Number).is_err());
  }

  #[test]
  fn test_mismatch() {
    let err = coerce(Document::from(true), AttributeKind::Map).unwrap_err();
    assert!(matches!(err, CodecError::TypeMismatch { .. }));
  }

  #[test]
  fn test_kind_names() {
    let kind: AttributeKind = serde_json::from_value(json!("string_set")).unwrap();
    assert_eq!(kind, AttributeKind::StringSet);
  }
}
