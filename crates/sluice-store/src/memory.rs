use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::record::{AttributeUpdate, Record};
use crate::schema::{KeyValue, RecordKey, TableSchema};
use crate::{RecordStore, StoreError};

/// Behavior switches for [`InMemoryRecordStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
  /// Fail updates with [`StoreError::NotFound`] instead of creating the record.
  pub require_existing: bool,
}

/// In-memory record store.
///
/// Used for tests and for running workflows locally from the CLI.
pub struct InMemoryRecordStore {
  schema: TableSchema,
  options: StoreOptions,
  records: RwLock<HashMap<String, (RecordKey, Record)>>,
}

impl InMemoryRecordStore {
  pub fn new(schema: TableSchema) -> Self {
    Self::with_options(schema, StoreOptions::default())
  }

  pub fn with_options(schema: TableSchema, options: StoreOptions) -> Self {
    Self {
      schema,
      options,
      records: RwLock::new(HashMap::new()),
    }
  }

  /// Number of stored records.
  pub fn len(&self) -> usize {
    self.records.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.read().is_empty()
  }

  /// Copy of every stored record.
  pub fn records(&self) -> Vec<Record> {
    self
      .records
      .read()
      .values()
      .map(|(_, record)| record.clone())
      .collect()
  }
}

fn compare_values(a: &KeyValue, b: &KeyValue) -> Ordering {
  match (a, b) {
    (KeyValue::Str(a), KeyValue::Str(b)) => a.cmp(b),
    (KeyValue::Num(a), KeyValue::Num(b)) => a.cmp(b),
    _ => Ordering::Equal,
  }
}

fn compare_sort(a: &Option<KeyValue>, b: &Option<KeyValue>) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => compare_values(a, b),
    _ => Ordering::Equal,
  }
}

fn compare_keys(a: &RecordKey, b: &RecordKey) -> Ordering {
  compare_values(&a.partition, &b.partition).then_with(|| compare_sort(&a.sort, &b.sort))
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
  fn schema(&self) -> &TableSchema {
    &self.schema
  }

  async fn put(&self, record: Record) -> Result<(), StoreError> {
    let key = self.schema.key_of(&record)?;
    debug!(table = %self.schema.table_name, key = %key, "put");
    self.records.write().insert(key.storage_key(), (key, record));
    Ok(())
  }

  async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
    Ok(
      self
        .records
        .read()
        .get(&key.storage_key())
        .map(|(_, record)| record.clone()),
    )
  }

  async fn update(&self, key: &RecordKey, updates: &[AttributeUpdate]) -> Result<Record, StoreError> {
    if let Some(update) = updates.iter().find(|u| self.schema.is_key_attribute(u.name())) {
      return Err(StoreError::KeyAttributeUpdate(update.name().to_string()));
    }

    let storage_key = key.storage_key();
    let mut records = self.records.write();

    let mut record = match records.get(&storage_key) {
      Some((_, existing)) => existing.clone(),
      None if self.options.require_existing => {
        return Err(StoreError::NotFound(key.to_string()));
      }
      None => {
        let mut fresh = Record::new();
        for (name, value) in self.schema.key_attributes(key) {
          fresh.insert(name, value);
        }
        fresh
      }
    };

    // Apply to a copy so a failing update leaves the stored record untouched.
    for update in updates {
      record.apply(update)?;
    }

    debug!(table = %self.schema.table_name, key = %key, updates = updates.len(), "update");
    records.insert(storage_key, (key.clone(), record.clone()));
    Ok(record)
  }

  async fn delete(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
    Ok(
      self
        .records
        .write()
        .remove(&key.storage_key())
        .map(|(_, record)| record),
    )
  }

  async fn query(&self, partition: &KeyValue) -> Result<Vec<Record>, StoreError> {
    let records = self.records.read();
    let mut matches: Vec<_> = records
      .values()
      .filter(|(key, _)| &key.partition == partition)
      .collect();
    matches.sort_by(|(a, _), (b, _)| compare_sort(&a.sort, &b.sort));
    Ok(matches.into_iter().map(|(_, record)| record.clone()).collect())
  }

  async fn scan(&self) -> Result<Vec<Record>, StoreError> {
    let records = self.records.read();
    let mut all: Vec<_> = records.values().collect();
    all.sort_by(|(a, _), (b, _)| compare_keys(a, b));
    debug!(table = %self.schema.table_name, count = all.len(), "scan");
    Ok(all.into_iter().map(|(_, record)| record.clone()).collect())
  }
}

#[cfg(test)]
mod tests {
  use sluice_codec::AttributeValue;
  use sluice_document::Number;

  use super::*;
  use crate::schema::KeyAttribute;

  fn schema() -> TableSchema {
    TableSchema::new("items", KeyAttribute::string("pk"))
  }

  fn key(pk: &str) -> RecordKey {
    RecordKey::new(KeyValue::Str(pk.into()))
  }

  fn num(s: &str) -> AttributeValue {
    AttributeValue::Num(s.parse().unwrap())
  }

  fn add(name: &str, value: AttributeValue) -> AttributeUpdate {
    AttributeUpdate::Add {
      name: name.into(),
      value,
    }
  }

  #[tokio::test]
  async fn test_put_then_get() {
    let store = InMemoryRecordStore::new(schema());
    let record = Record::new()
      .with("pk", AttributeValue::Str("A1".into()))
      .with("tags", AttributeValue::StringSet(vec!["p".into(), "q".into()]));

    store.put(record.clone()).await.unwrap();
    assert_eq!(store.get(&key("A1")).await.unwrap(), Some(record.clone()));

    // Second identical put is a no-op.
    store.put(record.clone()).await.unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&key("A1")).await.unwrap(), Some(record));
  }

  #[tokio::test]
  async fn test_get_missing_is_none() {
    let store = InMemoryRecordStore::new(schema());
    assert_eq!(store.get(&key("nope")).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_put_requires_key() {
    let store = InMemoryRecordStore::new(schema());
    let err = store.put(Record::new().with("x", num("1"))).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey { .. }));
  }

  #[tokio::test]
  async fn test_add_on_missing_key_upserts() {
    let store = InMemoryRecordStore::new(schema());
    let record = store.update(&key("new"), &[add("count", num("5"))]).await.unwrap();

    assert_eq!(record.get("count"), Some(&num("5")));
    assert_eq!(record.get("pk"), Some(&AttributeValue::Str("new".into())));
  }

  #[tokio::test]
  async fn test_add_twice_accumulates() {
    let store = InMemoryRecordStore::new(schema());
    store.update(&key("acc"), &[add("count", num("10"))]).await.unwrap();
    store.update(&key("acc"), &[add("count", num("10"))]).await.unwrap();

    let stored = store.get(&key("acc")).await.unwrap().unwrap();
    assert_eq!(stored.get("count"), Some(&num("20")));
  }

  #[tokio::test]
  async fn test_require_existing() {
    let store = InMemoryRecordStore::with_options(
      schema(),
      StoreOptions {
        require_existing: true,
      },
    );
    let err = store.update(&key("ghost"), &[add("count", num("1"))]).await.unwrap_err();
    assert_eq!(err, StoreError::NotFound("ghost".into()));
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_key_attributes_are_immutable() {
    let store = InMemoryRecordStore::new(schema());
    let err = store
      .update(
        &key("A1"),
        &[AttributeUpdate::Set {
          name: "pk".into(),
          value: AttributeValue::Str("B2".into()),
        }],
      )
      .await
      .unwrap_err();
    assert_eq!(err, StoreError::KeyAttributeUpdate("pk".into()));
  }

  #[tokio::test]
  async fn test_failed_update_leaves_record_untouched() {
    let store = InMemoryRecordStore::new(schema());
    store
      .put(Record::new().with("pk", AttributeValue::Str("A1".into())).with("n", num("1")))
      .await
      .unwrap();

    let result = store
      .update(
        &key("A1"),
        &[add("n", num("1")), add("n", AttributeValue::Bool(true))],
      )
      .await;
    assert!(result.is_err());

    let stored = store.get(&key("A1")).await.unwrap().unwrap();
    assert_eq!(stored.get("n"), Some(&num("1")));
  }

  #[tokio::test]
  async fn test_delete() {
    let store = InMemoryRecordStore::new(schema());
    let record = Record::new().with("pk", AttributeValue::Str("A1".into()));
    store.put(record.clone()).await.unwrap();

    assert_eq!(store.delete(&key("A1")).await.unwrap(), Some(record));
    assert_eq!(store.delete(&key("A1")).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_query_orders_by_sort_key() {
    let schema = TableSchema::new("ledger", KeyAttribute::string("account"))
      .with_sort_key(KeyAttribute::number("seq"));
    let store = InMemoryRecordStore::new(schema);

    for (account, seq) in [("a", "10"), ("a", "2"), ("b", "1"), ("a", "7")] {
      store
        .put(
          Record::new()
            .with("account", AttributeValue::Str(account.into()))
            .with("seq", num(seq)),
        )
        .await
        .unwrap();
    }

    let records = store.query(&KeyValue::Str("a".into())).await.unwrap();
    let seqs: Vec<_> = records
      .iter()
      .map(|r| r.get("seq").and_then(AttributeValue::as_number).unwrap().to_string())
      .collect();
    assert_eq!(seqs, vec!["2", "7", "10"]);
  }

  #[tokio::test]
  async fn test_query_orders_large_sort_keys_exactly() {
    let schema = TableSchema::new("ledger", KeyAttribute::string("account"))
      .with_sort_key(KeyAttribute::number("seq"));
    let store = InMemoryRecordStore::new(schema);

    // Past 2^53 neighbouring integers share an f64.
    let first: u64 = 9_007_199_254_740_992;
    for offset in (0..20u64).rev() {
      store
        .put(
          Record::new()
            .with("account", AttributeValue::Str("a".into()))
            .with("seq", AttributeValue::Num(Number::from(first + offset))),
        )
        .await
        .unwrap();
    }

    let records = store.query(&KeyValue::Str("a".into())).await.unwrap();
    let seqs: Vec<_> = records
      .iter()
      .map(|r| r.get("seq").and_then(AttributeValue::as_number).unwrap().to_string())
      .collect();
    let expected: Vec<_> = (0..20u64).map(|offset| (first + offset).to_string()).collect();
    assert_eq!(seqs, expected);
  }

  #[tokio::test]
  async fn test_scan_returns_every_partition_in_key_order() {
    let schema = TableSchema::new("ledger", KeyAttribute::string("account"))
      .with_sort_key(KeyAttribute::number("seq"));
    let store = InMemoryRecordStore::new(schema);

    for (account, seq) in [("b", "1"), ("a", "10"), ("a", "2")] {
      store
        .put(
          Record::new()
            .with("account", AttributeValue::Str(account.into()))
            .with("seq", num(seq)),
        )
        .await
        .unwrap();
    }

    let keys: Vec<_> = store
      .scan()
      .await
      .unwrap()
      .iter()
      .map(|r| {
        let account = r.get("account").and_then(AttributeValue::as_str).unwrap().to_string();
        let seq = r.get("seq").and_then(AttributeValue::as_number).unwrap().to_string();
        (account, seq)
      })
      .collect();
    assert_eq!(
      keys,
      vec![
        ("a".to_string(), "2".to_string()),
        ("a".to_string(), "10".to_string()),
        ("b".to_string(), "1".to_string()),
      ]
    );
    assert!(InMemoryRecordStore::new(self::schema()).scan().await.unwrap().is_empty());
  }
}
