use indexmap::IndexMap;
use sluice_document::Document;

use crate::attribute::AttributeValue;
use crate::error::CodecError;

/// Encode a document into its attribute representation.
///
/// Fails with [`CodecError::TypeMismatch`] for sets that contain anything
/// other than strings.
pub fn encode(doc: &Document) -> Result<AttributeValue, CodecError> {
  Ok(match doc {
    Document::Null => AttributeValue::Null,
    Document::Bool(b) => AttributeValue::Bool(*b),
    Document::Number(n) => AttributeValue::Num(n.clone()),
    Document::String(s) => AttributeValue::Str(s.clone()),
    Document::Binary(bytes) => AttributeValue::Binary(bytes.clone()),
    Document::List(items) => AttributeValue::List(items.iter().map(encode).collect::<Result<_, _>>()?),
    Document::Set(items) => AttributeValue::StringSet(encode_string_set(items)?),
    Document::Map(map) => AttributeValue::Map(
      map
        .iter()
        .map(|(k, v)| Ok((k.clone(), encode(v)?)))
        .collect::<Result<IndexMap<_, _>, CodecError>>()?,
    ),
  })
}

fn encode_string_set(items: &[Document]) -> Result<Vec<String>, CodecError> {
  let mut unique: Vec<String> = Vec::with_capacity(items.len());
  for item in items {
    let s = match item {
      Document::String(s) => s,
      Document::Set(_) | Document::Map(_) | Document::List(_) => {
        return Err(CodecError::TypeMismatch {
          message: format!("sets cannot contain a nested {}", item.type_name()),
        });
      }
      other => {
        return Err(CodecError::TypeMismatch {
          message: format!("set elements must be strings, found {}", other.type_name()),
        });
      }
    };
    if !unique.iter().any(|u| u == s) {
      unique.push(s.clone());
    }
  }
  Ok(unique)
}

/// Decode an attribute value back into a document.
pub fn decode(value: &AttributeValue) -> Document {
  match value {
    AttributeValue::Null => Document::Null,
    AttributeValue::Str(s) => Document::String(s.clone()),
    AttributeValue::Num(n) => Document::Number(n.clone()),
    AttributeValue::Bool(b) => Document::Bool(*b),
    AttributeValue::Binary(bytes) => Document::Binary(bytes.clone()),
    AttributeValue::List(items) => Document::List(items.iter().map(decode).collect()),
    AttributeValue::StringSet(items) => {
      Document::Set(items.iter().cloned().map(Document::String).collect())
    }
    AttributeValue::Map(map) => Document::Map(
      map
        .iter()
        .map(|(k, v)| (k.clone(), decode(v)))
        .collect(),
    ),
  }
}

/// Decode a document shaped like the tagged wire form, e.g.
/// `{"M": {"num": {"N": "2"}}}`, into a plain document.
pub fn decode_fragment(fragment: &Document) -> Result<Document, CodecError> {
  let json = serde_json::Value::from(fragment.clone());
  let value: AttributeValue =
    serde_json::from_value(json).map_err(|e| CodecError::MalformedFragment {
      message: e.to_string(),
    })?;
  Ok(decode(&value))
}
