//! Sluice Store
//!
//! This crate provides the persistence adapter used by `service_call` nodes.
//! Records are maps of typed attributes addressed by a partition key and an
//! optional sort key, as described by a [`TableSchema`].
//!
//! The [`RecordStore`] trait defines operations for:
//! - Idempotent whole-record writes (`put`)
//! - Point reads and deletes, where absence is not an error
//! - Partial updates with SET / ADD / REMOVE semantics
//! - Listing all records under one partition (`query`) or in the whole table
//!   (`scan`)
//!
//! [`InMemoryRecordStore`] is the bundled implementation. [`RetryingStore`]
//! wraps any store and retries transient failures where doing so cannot
//! double-apply a write.

mod memory;
mod record;
mod retry;
mod schema;

pub use memory::{InMemoryRecordStore, StoreOptions};
pub use record::{AttributeUpdate, Record};
pub use retry::{RetryPolicy, RetryingStore};
pub use schema::{KeyAttribute, KeyType, KeyValue, RecordKey, TableSchema};

use std::sync::Arc;

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
  /// The record does not exist and the operation requires it.
  #[error("record not found: {0}")]
  NotFound(String),

  /// A key is missing or has the wrong type.
  #[error("invalid key: {message}")]
  InvalidKey { message: String },

  /// Key attributes cannot change once written.
  #[error("cannot update key attribute '{0}'")]
  KeyAttributeUpdate(String),

  /// An update cannot be applied to the stored attribute.
  #[error("type mismatch on attribute '{attribute}': {message}")]
  TypeMismatch { attribute: String, message: String },

  /// Transient failure; the store confirmed nothing was applied.
  #[error("store unavailable: {message}")]
  Unavailable { message: String },

  /// Transient failure; the operation may or may not have been applied.
  #[error("store outcome unknown: {message}")]
  Ambiguous { message: String },
}

impl StoreError {
  /// Whether retrying could succeed.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      StoreError::Unavailable { .. } | StoreError::Ambiguous { .. }
    )
  }
}

/// Storage trait for keyed attribute records.
#[async_trait]
pub trait RecordStore: Send + Sync {
  /// Key layout of the backing table.
  fn schema(&self) -> &TableSchema;

  /// Write a record, replacing any record with the same key.
  async fn put(&self, record: Record) -> Result<(), StoreError>;

  /// Read a record by key.
  async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError>;

  /// Apply `updates` and return the record as stored afterwards.
  async fn update(&self, key: &RecordKey, updates: &[AttributeUpdate]) -> Result<Record, StoreError>;

  /// Remove a record, returning it if it existed.
  async fn delete(&self, key: &RecordKey) -> Result<Option<Record>, StoreError>;

  /// All records with the given partition value, ordered by sort key.
  async fn query(&self, partition: &KeyValue) -> Result<Vec<Record>, StoreError>;

  /// Every record in the table, ordered by partition then sort key.
  async fn scan(&self) -> Result<Vec<Record>, StoreError>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
  fn schema(&self) -> &TableSchema {
    (**self).schema()
  }

  async fn put(&self, record: Record) -> Result<(), StoreError> {
    (**self).put(record).await
  }

  async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
    (**self).get(key).await
  }

  async fn update(&self, key: &RecordKey, updates: &[AttributeUpdate]) -> Result<Record, StoreError> {
    (**self).update(key, updates).await
  }

  async fn delete(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
    (**self).delete(key).await
  }

  async fn query(&self, partition: &KeyValue) -> Result<Vec<Record>, StoreError> {
    (**self).query(partition).await
  }

  async fn scan(&self) -> Result<Vec<Record>, StoreError> {
    (**self).scan().await
  }
}
