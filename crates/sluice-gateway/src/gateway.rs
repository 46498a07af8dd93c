use std::sync::Arc;

use sluice_codec::CodecError;
use sluice_document::Document;
use sluice_runtime::{NodeError, Runtime, RuntimeError};
use sluice_store::StoreError;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::response::{ErrorCode, GatewayResponse, ResponseConfig};
use crate::schema::{InputSchema, ValidationError};

/// Validates requests, runs the workflow and maps the outcome.
pub struct Gateway {
  runtime: Arc<Runtime>,
  schema: InputSchema,
  response: ResponseConfig,
}

impl Gateway {
  pub fn new(runtime: Arc<Runtime>, schema: InputSchema, response: ResponseConfig) -> Self {
    Self {
      runtime,
      schema,
      response,
    }
  }

  pub fn runtime(&self) -> &Runtime {
    &self.runtime
  }

  /// Handle a raw JSON request body.
  pub async fn handle(&self, body: &str, cancel: CancellationToken) -> GatewayResponse {
    match serde_json::from_str::<serde_json::Value>(body) {
      Ok(value) => self.handle_document(Document::from(value), cancel).await,
      Err(e) => rejected(ValidationError::Malformed {
        message: e.to_string(),
      }),
    }
  }

  /// Handle an already-parsed request document.
  #[instrument(
    name = "gateway_handle",
    skip(self, input, cancel),
    fields(workflow_id = %self.runtime.workflow().workflow_id)
  )]
  pub async fn handle_document(&self, input: Document, cancel: CancellationToken) -> GatewayResponse {
    if let Err(e) = self.schema.validate(&input) {
      return rejected(e);
    }

    let result = match self.runtime.invoke(input, cancel).await {
      Ok(result) => result,
      Err(e) => {
        let (code, message) = classify(&e);
        warn!(code = code.as_str(), error = %e, "request_failed");
        return GatewayResponse::error(code, message);
      }
    };

    let output = match &self.response.path {
      Some(path) => match path.select(&result.output) {
        Ok(selected) => selected.clone(),
        Err(e) => {
          warn!(error = %e, "response_path_failed");
          return GatewayResponse::error(ErrorCode::Internal, e.to_string());
        }
      },
      None => result.output.clone(),
    };

    let output = match &self.response.wrap_key {
      Some(key) => [(key.clone(), output)].into_iter().collect(),
      None => output,
    };

    info!(
      execution_id = %result.execution_id,
      duration_ms = result.duration_ms(),
      "request_completed"
    );
    GatewayResponse::ok(serde_json::Value::from(output))
  }
}

fn rejected(e: ValidationError) -> GatewayResponse {
  warn!(error = %e, "request_rejected");
  GatewayResponse::error(ErrorCode::ValidationError, e.to_string())
}

/// Map a runtime failure to a code and a message without node ids.
fn classify(e: &RuntimeError) -> (ErrorCode, String) {
  match e.root_cause() {
    RuntimeError::NodeFailed { source, .. } => {
      let code = match source {
        NodeError::Store(StoreError::NotFound(_)) => ErrorCode::NotFound,
        NodeError::Store(StoreError::TypeMismatch { .. })
        | NodeError::Codec(CodecError::TypeMismatch { .. }) => ErrorCode::TypeMismatch,
        _ => ErrorCode::NodeExecutionFailed,
      };
      (code, source.to_string())
    }
    RuntimeError::InvalidDefinition { .. } => (ErrorCode::InvalidDefinition, e.root_cause().to_string()),
    RuntimeError::Timeout { .. } => (ErrorCode::Timeout, e.root_cause().to_string()),
    RuntimeError::Cancelled => (ErrorCode::Cancelled, e.root_cause().to_string()),
    other => (ErrorCode::Internal, other.to_string()),
  }
}
