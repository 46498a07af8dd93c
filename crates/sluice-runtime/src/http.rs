use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use sluice_document::Document;
use tracing::debug;

use crate::task::{TaskError, TaskHandler};

/// A task backed by an HTTP endpoint.
///
/// The payload is POSTed as JSON and the JSON response body becomes the
/// task's result. Non-2xx responses are task failures.
#[derive(Debug, Clone)]
pub struct HttpTask {
  client: Client,
  url: Url,
  timeout: Option<Duration>,
}

impl HttpTask {
  pub fn new(client: Client, url: &str) -> Result<Self, TaskError> {
    let url = Url::parse(url).map_err(|e| TaskError::Transport(format!("invalid url '{}': {}", url, e)))?;
    Ok(Self {
      client,
      url,
      timeout: None,
    })
  }

  /// Per-request timeout, in addition to the execution ceiling.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }
}

#[async_trait]
impl TaskHandler for HttpTask {
  async fn invoke(&self, payload: Document) -> Result<Document, TaskError> {
    let body = serde_json::Value::from(payload);

    let mut request = self.client.post(self.url.clone()).json(&body);
    if let Some(timeout) = self.timeout {
      request = request.timeout(timeout);
    }

    let response = request
      .send()
      .await
      .map_err(|e| TaskError::Transport(e.to_string()))?;

    let status = response.status();
    debug!(url = %self.url, status = status.as_u16(), "http_task_response");

    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(TaskError::Failed(format!("HTTP {}: {}", status.as_u16(), text)));
    }

    let value: serde_json::Value = response
      .json()
      .await
      .map_err(|e| TaskError::InvalidResponse(e.to_string()))?;
    Ok(Document::from(value))
  }
}
