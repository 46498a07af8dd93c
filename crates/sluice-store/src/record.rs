use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sluice_codec::{AttributeValue, CodecError, decode, encode};
use sluice_document::{Document, Number};

use crate::StoreError;

/// A stored record: named attributes in insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
  attributes: IndexMap<String, AttributeValue>,
}

impl Record {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
    self.attributes.insert(name.into(), value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&AttributeValue> {
    self.attributes.get(name)
  }

  pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
    self.attributes.insert(name.into(), value);
  }

  pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
    &self.attributes
  }

  /// Copy holding only the named attributes, in the order given. Names the
  /// record lacks are skipped.
  pub fn project(&self, names: &[String]) -> Record {
    Record {
      attributes: names
        .iter()
        .filter_map(|name| {
          self
            .attributes
            .get(name)
            .map(|value| (name.clone(), value.clone()))
        })
        .collect(),
    }
  }

  /// Encode a map document as a record.
  pub fn from_document(doc: &Document) -> Result<Self, CodecError> {
    match encode(doc)? {
      AttributeValue::Map(attributes) => Ok(Self { attributes }),
      other => Err(CodecError::TypeMismatch {
        message: format!("a record must be a map, got {}", other.tag()),
      }),
    }
  }

  /// Decode the record into a map document.
  pub fn to_document(&self) -> Document {
    Document::Map(
      self
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), decode(v)))
        .collect(),
    )
  }

  /// Apply one update in place.
  pub(crate) fn apply(&mut self, update: &AttributeUpdate) -> Result<(), StoreError> {
    match update {
      AttributeUpdate::Set { name, value } => {
        self.attributes.insert(name.clone(), value.clone());
      }
      AttributeUpdate::Remove { name } => {
        self.attributes.shift_remove(name);
      }
      AttributeUpdate::Add { name, value } => {
        let merged = add(name, self.attributes.get(name), value)?;
        self.attributes.insert(name.clone(), merged);
      }
    }
    Ok(())
  }
}

fn add(
  name: &str,
  current: Option<&AttributeValue>,
  delta: &AttributeValue,
) -> Result<AttributeValue, StoreError> {
  let mismatch = |message: String| StoreError::TypeMismatch {
    attribute: name.to_string(),
    message,
  };

  match (current, delta) {
    (None, AttributeValue::Num(delta)) => {
      let zero = Number::from(0i64);
      zero
        .checked_add(delta)
        .map(AttributeValue::Num)
        .map_err(|e| mismatch(e.to_string()))
    }
    (Some(AttributeValue::Num(current)), AttributeValue::Num(delta)) => current
      .checked_add(delta)
      .map(AttributeValue::Num)
      .map_err(|e| mismatch(e.to_string())),
    (None, AttributeValue::StringSet(items)) => Ok(AttributeValue::StringSet(items.clone())),
    (Some(AttributeValue::StringSet(current)), AttributeValue::StringSet(items)) => {
      let mut union = current.clone();
      for item in items {
        if !union.contains(item) {
          union.push(item.clone());
        }
      }
      Ok(AttributeValue::StringSet(union))
    }
    (Some(current), AttributeValue::Num(_) | AttributeValue::StringSet(_)) => Err(mismatch(format!(
      "cannot ADD {} to stored {}",
      delta.tag(),
      current.tag()
    ))),
    (_, other) => Err(mismatch(format!(
      "ADD supports numbers and string sets, got {}",
      other.tag()
    ))),
  }
}

/// One attribute change applied by [`RecordStore::update`](crate::RecordStore::update).
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeUpdate {
  /// Overwrite the attribute.
  Set { name: String, value: AttributeValue },
  /// Numeric increment or string set union. Missing attributes start from
  /// zero or the empty set.
  Add { name: String, value: AttributeValue },
  /// Delete the attribute if present.
  Remove { name: String },
}

impl AttributeUpdate {
  pub fn name(&self) -> &str {
    match self {
      AttributeUpdate::Set { name, .. }
      | AttributeUpdate::Add { name, .. }
      | AttributeUpdate::Remove { name } => name,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn num(s: &str) -> AttributeValue {
    AttributeValue::Num(s.parse().unwrap())
  }

  fn add_update(name: &str, value: AttributeValue) -> AttributeUpdate {
    AttributeUpdate::Add {
      name: name.into(),
      value,
    }
  }

  #[test]
  fn test_add_on_missing_number_starts_at_zero() {
    let mut record = Record::new();
    record.apply(&add_update("count", num("5"))).unwrap();
    assert_eq!(record.get("count"), Some(&num("5")));

    record.apply(&add_update("count", num("2.5"))).unwrap();
    assert_eq!(record.get("count"), Some(&num("7.5")));
  }

  #[test]
  fn test_add_string_set_unions() {
    let mut record = Record::new().with("tags", AttributeValue::StringSet(vec!["p".into()]));
    record
      .apply(&add_update(
        "tags",
        AttributeValue::StringSet(vec!["p".into(), "q".into()]),
      ))
      .unwrap();
    assert_eq!(
      record.get("tags"),
      Some(&AttributeValue::StringSet(vec!["p".into(), "q".into()]))
    );
  }

  #[test]
  fn test_add_type_mismatch() {
    let mut record = Record::new().with("count", AttributeValue::Str("x".into()));
    let err = record.apply(&add_update("count", num("1"))).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));

    let err = record
      .apply(&add_update("other", AttributeValue::Bool(true)))
      .unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));
  }

  #[test]
  fn test_set_and_remove() {
    let mut record = Record::new().with("a", num("1")).with("b", num("2"));
    record
      .apply(&AttributeUpdate::Set {
        name: "a".into(),
        value: AttributeValue::Bool(false),
      })
      .unwrap();
    record
      .apply(&AttributeUpdate::Remove { name: "b".into() })
      .unwrap();

    assert_eq!(record, Record::new().with("a", AttributeValue::Bool(false)));
  }

  #[test]
  fn test_project_keeps_named_attributes() {
    let record = Record::new()
      .with("pk", AttributeValue::Str("ACCOUNT#1".into()))
      .with("sk", AttributeValue::Str("TRANSACTION#9".into()))
      .with("amount", num("12.50"))
      .with("description", AttributeValue::Str("coffee".into()));

    let names = ["description".to_string(), "pk".to_string(), "missing".to_string()];
    assert_eq!(
      record.project(&names),
      Record::new()
        .with("description", AttributeValue::Str("coffee".into()))
        .with("pk", AttributeValue::Str("ACCOUNT#1".into()))
    );
    assert_eq!(record.project(&[]), Record::new());
  }

  #[test]
  fn test_document_round_trip() {
    let doc = Document::from(serde_json::json!({"pk": "A1", "num": 3}));
    let record = Record::from_document(&doc).unwrap();
    assert_eq!(record.get("pk"), Some(&AttributeValue::Str("A1".into())));
    assert_eq!(record.to_document(), doc);
    assert!(Record::from_document(&Document::from("x")).is_err());
  }
}
