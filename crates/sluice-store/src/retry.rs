//! Transparent retries for transient store failures.
//!
//! `put`, `get`, `delete`, `query` and `scan` are idempotent, so they are
//! retried on any transient error. `update` may carry ADD deltas, so it is
//! retried only on [`StoreError::Unavailable`], where the store confirmed
//! nothing was applied. [`StoreError::Ambiguous`] update failures are
//! returned to the caller as-is.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::record::{AttributeUpdate, Record};
use crate::schema::{KeyValue, RecordKey, TableSchema};
use crate::{RecordStore, StoreError};

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
  /// Maximum number of attempts, including the first.
  pub max_attempts: u32,
  pub initial_interval: Duration,
  pub max_interval: Duration,
  pub backoff_coefficient: f64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::exponential()
  }
}

impl RetryPolicy {
  /// 3 attempts starting at 50ms, doubling, capped at 1s.
  pub fn exponential() -> Self {
    Self {
      max_attempts: 3,
      initial_interval: Duration::from_millis(50),
      max_interval: Duration::from_secs(1),
      backoff_coefficient: 2.0,
    }
  }

  pub fn no_retry() -> Self {
    Self {
      max_attempts: 1,
      initial_interval: Duration::ZERO,
      max_interval: Duration::ZERO,
      backoff_coefficient: 1.0,
    }
  }

  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  pub fn with_initial_interval(mut self, interval: Duration) -> Self {
    self.initial_interval = interval;
    self
  }

  pub fn with_max_interval(mut self, interval: Duration) -> Self {
    self.max_interval = interval;
    self
  }

  /// Delay before `attempt` (1-based). The first attempt has no delay.
  pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
    if attempt <= 1 {
      return Duration::ZERO;
    }
    let retry_num = attempt - 2;
    let base = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(retry_num as i32);
    Duration::from_secs_f64(base.min(self.max_interval.as_secs_f64()))
  }
}

/// A [`RecordStore`] wrapper that retries transient failures.
pub struct RetryingStore<S> {
  inner: S,
  policy: RetryPolicy,
}

impl<S: RecordStore> RetryingStore<S> {
  pub fn new(inner: S, policy: RetryPolicy) -> Self {
    Self { inner, policy }
  }

  pub fn inner(&self) -> &S {
    &self.inner
  }

  async fn with_retry<T, F, Fut>(
    &self,
    operation: &'static str,
    retryable: fn(&StoreError) -> bool,
    mut call: F,
  ) -> Result<T, StoreError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
  {
    let mut attempt = 1;
    loop {
      match call().await {
        Err(e) if retryable(&e) && attempt < self.policy.max_attempts => {
          attempt += 1;
          let delay = self.policy.delay_for_attempt(attempt);
          warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "store_retry"
          );
          tokio::time::sleep(delay).await;
        }
        result => return result,
      }
    }
  }
}

fn any_transient(e: &StoreError) -> bool {
  e.is_transient()
}

fn confirmed_not_applied(e: &StoreError) -> bool {
  matches!(e, StoreError::Unavailable { .. })
}

#[async_trait]
impl<S: RecordStore> RecordStore for RetryingStore<S> {
  fn schema(&self) -> &TableSchema {
    self.inner.schema()
  }

  async fn put(&self, record: Record) -> Result<(), StoreError> {
    self
      .with_retry("put", any_transient, || self.inner.put(record.clone()))
      .await
  }

  async fn get(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
    self
      .with_retry("get", any_transient, || self.inner.get(key))
      .await
  }

  async fn update(&self, key: &RecordKey, updates: &[AttributeUpdate]) -> Result<Record, StoreError> {
    self
      .with_retry("update", confirmed_not_applied, || self.inner.update(key, updates))
      .await
  }

  async fn delete(&self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
    self
      .with_retry("delete", any_transient, || self.inner.delete(key))
      .await
  }

  async fn query(&self, partition: &KeyValue) -> Result<Vec<Record>, StoreError> {
    self
      .with_retry("query", any_transient, || self.inner.query(partition))
      .await
  }

  async fn scan(&self) -> Result<Vec<Record>, StoreError> {
    self
      .with_retry("scan", any_transient, || self.inner.scan())
      .await
  }
}
