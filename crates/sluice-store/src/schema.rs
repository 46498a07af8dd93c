use std::fmt;

use serde::{Deserialize, Serialize};
use sluice_codec::AttributeValue;
use sluice_document::Number;

use crate::StoreError;
use crate::record::Record;

/// Scalar type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
  #[serde(rename = "S")]
  String,
  #[serde(rename = "N")]
  Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
  pub name: String,
  #[serde(rename = "type")]
  pub key_type: KeyType,
}

impl KeyAttribute {
  pub fn string(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      key_type: KeyType::String,
    }
  }

  pub fn number(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      key_type: KeyType::Number,
    }
  }
}

/// Key layout of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
  pub table_name: String,
  pub partition_key: KeyAttribute,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sort_key: Option<KeyAttribute>,
}

impl TableSchema {
  pub fn new(table_name: impl Into<String>, partition_key: KeyAttribute) -> Self {
    Self {
      table_name: table_name.into(),
      partition_key,
      sort_key: None,
    }
  }

  pub fn with_sort_key(mut self, sort_key: KeyAttribute) -> Self {
    self.sort_key = Some(sort_key);
    self
  }

  pub fn is_key_attribute(&self, name: &str) -> bool {
    self.partition_key.name == name || self.sort_key.as_ref().is_some_and(|k| k.name == name)
  }

  /// Check a partition value against the schema.
  pub fn partition_value(&self, value: &AttributeValue) -> Result<KeyValue, StoreError> {
    typed_key(&self.partition_key, value)
  }

  /// Build a key from attribute values, checking them against the schema.
  pub fn key_from_values(
    &self,
    partition: &AttributeValue,
    sort: Option<&AttributeValue>,
  ) -> Result<RecordKey, StoreError> {
    let partition = typed_key(&self.partition_key, partition)?;
    let sort = match (&self.sort_key, sort) {
      (Some(attr), Some(value)) => Some(typed_key(attr, value)?),
      (None, None) => None,
      (Some(attr), None) => {
        return Err(StoreError::InvalidKey {
          message: format!("missing sort key '{}'", attr.name),
        });
      }
      (None, Some(_)) => {
        return Err(StoreError::InvalidKey {
          message: format!("table '{}' has no sort key", self.table_name),
        });
      }
    };
    Ok(RecordKey { partition, sort })
  }

  /// Extract the key of a record.
  pub fn key_of(&self, record: &Record) -> Result<RecordKey, StoreError> {
    let missing = |name: &str| StoreError::InvalidKey {
      message: format!("record is missing key attribute '{}'", name),
    };

    let partition = record
      .get(&self.partition_key.name)
      .ok_or_else(|| missing(&self.partition_key.name))?;
    let sort = match &self.sort_key {
      Some(attr) => Some(record.get(&attr.name).ok_or_else(|| missing(&attr.name))?),
      None => None,
    };
    self.key_from_values(partition, sort)
  }

  /// The key as named attributes, used to seed records created by upsert.
  pub fn key_attributes(&self, key: &RecordKey) -> Vec<(String, AttributeValue)> {
    let mut attrs = vec![(self.partition_key.name.clone(), key.partition.to_attribute())];
    if let (Some(attr), Some(sort)) = (&self.sort_key, &key.sort) {
      attrs.push((attr.name.clone(), sort.to_attribute()));
    }
    attrs
  }
}

fn typed_key(attr: &KeyAttribute, value: &AttributeValue) -> Result<KeyValue, StoreError> {
  match (attr.key_type, value) {
    (KeyType::String, AttributeValue::Str(s)) if !s.is_empty() => Ok(KeyValue::Str(s.clone())),
    (KeyType::Number, AttributeValue::Num(n)) => Ok(KeyValue::Num(n.clone())),
    _ => Err(StoreError::InvalidKey {
      message: format!(
        "key '{}' expects type {:?}, got {}",
        attr.name,
        attr.key_type,
        value.tag()
      ),
    }),
  }
}

/// A scalar key component.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
  Str(String),
  Num(Number),
}

impl KeyValue {
  pub fn to_attribute(&self) -> AttributeValue {
    match self {
      KeyValue::Str(s) => AttributeValue::Str(s.clone()),
      KeyValue::Num(n) => AttributeValue::Num(n.clone()),
    }
  }

  /// Text that is equal for equal keys.
  pub(crate) fn storage_text(&self) -> String {
    match self {
      KeyValue::Str(s) => format!("S:{}", s),
      KeyValue::Num(n) => format!("N:{}", n.canonical()),
    }
  }
}

impl fmt::Display for KeyValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyValue::Str(s) => f.write_str(s),
      KeyValue::Num(n) => write!(f, "{}", n),
    }
  }
}

/// Full key of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordKey {
  pub partition: KeyValue,
  pub sort: Option<KeyValue>,
}

impl RecordKey {
  pub fn new(partition: KeyValue) -> Self {
    Self {
      partition,
      sort: None,
    }
  }

  pub fn with_sort(mut self, sort: KeyValue) -> Self {
    self.sort = Some(sort);
    self
  }

  pub(crate) fn storage_key(&self) -> String {
    match &self.sort {
      Some(sort) => format!("{}\u{0}{}", self.partition.storage_text(), sort.storage_text()),
      None => self.partition.storage_text(),
    }
  }
}

impl fmt::Display for RecordKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.sort {
      Some(sort) => write!(f, "{}/{}", self.partition, sort),
      None => write!(f, "{}", self.partition),
    }
  }
}
