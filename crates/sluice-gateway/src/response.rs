use serde::{Deserialize, Serialize};
use serde_json::json;
use sluice_document::DocumentPath;

/// Stable error codes returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  ValidationError,
  NotFound,
  TypeMismatch,
  NodeExecutionFailed,
  Timeout,
  Cancelled,
  InvalidDefinition,
  Internal,
}

impl ErrorCode {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorCode::ValidationError => "VALIDATION_ERROR",
      ErrorCode::NotFound => "NOT_FOUND",
      ErrorCode::TypeMismatch => "TYPE_MISMATCH",
      ErrorCode::NodeExecutionFailed => "NODE_EXECUTION_FAILED",
      ErrorCode::Timeout => "TIMEOUT",
      ErrorCode::Cancelled => "CANCELLED",
      ErrorCode::InvalidDefinition => "INVALID_DEFINITION",
      ErrorCode::Internal => "INTERNAL",
    }
  }

  /// HTTP-style status for this code.
  pub fn status(self) -> u16 {
    match self {
      ErrorCode::ValidationError => 400,
      ErrorCode::NotFound => 404,
      ErrorCode::TypeMismatch => 422,
      ErrorCode::NodeExecutionFailed => 502,
      ErrorCode::Timeout => 504,
      ErrorCode::Cancelled => 503,
      ErrorCode::InvalidDefinition | ErrorCode::Internal => 500,
    }
  }
}

/// How a successful execution's document becomes the response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
  /// Part of the final document to return. Defaults to all of it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<DocumentPath>,
  /// Wrap the selected value as `{"<wrap_key>": value}`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wrap_key: Option<String>,
}

/// What the gateway hands back to its transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
  pub status: u16,
  pub body: serde_json::Value,
}

impl GatewayResponse {
  pub fn ok(body: serde_json::Value) -> Self {
    Self { status: 200, body }
  }

  /// `{"error": {"code": ..., "message": ...}}` with the code's status.
  pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
    Self {
      status: code.status(),
      body: json!({
        "error": {
          "code": code.as_str(),
          "message": message.into(),
        }
      }),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// The error code, when this is an error response.
  pub fn error_code(&self) -> Option<&str> {
    self.body.get("error")?.get("code")?.as_str()
  }
}
