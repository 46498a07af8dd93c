//! Integration tests for Gateway::handle over a real runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use sluice_config::WorkflowDef;
use sluice_document::{Document, DocumentPath};
use sluice_gateway::{FieldType, Gateway, InputSchema, ResponseConfig};
use sluice_runtime::{FnTask, Runtime, RuntimeConfig, TaskError, TaskRegistry};
use sluice_store::{InMemoryRecordStore, KeyAttribute, StoreOptions, TableSchema};
use tokio_util::sync::CancellationToken;

fn schema() -> TableSchema {
  TableSchema::new("items", KeyAttribute::string("pk"))
}

fn runtime(definition: serde_json::Value, tasks: TaskRegistry, store: InMemoryRecordStore) -> Arc<Runtime> {
  let def: WorkflowDef = serde_json::from_value(definition).unwrap();
  let workflow = sluice_workflow::resolve(def).unwrap();
  Arc::new(Runtime::new(workflow, tasks, Arc::new(store), RuntimeConfig::default()).unwrap())
}

/// A one-node workflow calling `translate`, plus a counter of calls.
fn translate_gateway(response: ResponseConfig) -> (Gateway, Arc<AtomicUsize>) {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = calls.clone();
  let tasks = TaskRegistry::new().with(
    "translate",
    FnTask::new(move |payload: Document| {
      counter.fetch_add(1, Ordering::SeqCst);
      let text = payload
        .get("input")
        .and_then(|input| input.get("text"))
        .and_then(Document::as_str)
        .ok_or_else(|| TaskError::Failed("text is required".into()))?;
      Ok(Document::from(json!({"translated": text.to_uppercase(), "source": "es"})))
    }),
  );

  let runtime = runtime(
    json!({
      "workflow_id": "translate",
      "name": "Translate",
      "start_at": "call",
      "nodes": [{"node_id": "call", "type": "task", "function": "translate"}],
    }),
    tasks,
    InMemoryRecordStore::new(schema()),
  );

  let schema = InputSchema::new().require("text", FieldType::String);
  (Gateway::new(runtime, schema, response), calls)
}

#[tokio::test]
async fn test_missing_field_is_rejected_before_execution() {
  let (gateway, calls) = translate_gateway(ResponseConfig::default());

  let response = gateway
    .handle(r#"{"language": "es"}"#, CancellationToken::new())
    .await;

  assert_eq!(response.status, 400);
  assert_eq!(response.error_code(), Some("VALIDATION_ERROR"));
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
  let (gateway, calls) = translate_gateway(ResponseConfig::default());

  let response = gateway.handle("{not json", CancellationToken::new()).await;

  assert_eq!(response.status, 400);
  assert_eq!(response.error_code(), Some("VALIDATION_ERROR"));
  assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_with_response_shaping() {
  let (gateway, calls) = translate_gateway(ResponseConfig {
    path: Some(DocumentPath::root().field("translated")),
    wrap_key: Some("body".into()),
  });

  let response = gateway
    .handle(r#"{"text": "hola"}"#, CancellationToken::new())
    .await;

  assert!(response.is_success());
  assert_eq!(response.body, json!({"body": "HOLA"}));
  assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_update_of_missing_record_is_not_found() {
  let runtime = runtime(
    json!({
      "workflow_id": "touch",
      "name": "Touch",
      "start_at": "touch",
      "nodes": [{
        "node_id": "touch",
        "type": "service_call",
        "operation": "update",
        "key": {"partition": {"path": "$.pk"}},
        "updates": [{"attribute": "seen", "action": "set", "operand": {"value": true}}],
      }],
    }),
    TaskRegistry::new(),
    InMemoryRecordStore::with_options(
      schema(),
      StoreOptions {
        require_existing: true,
      },
    ),
  );
  let gateway = Gateway::new(runtime, InputSchema::new(), ResponseConfig::default());

  let response = gateway
    .handle(r#"{"pk": "ghost"}"#, CancellationToken::new())
    .await;

  assert_eq!(response.status, 404);
  assert_eq!(response.error_code(), Some("NOT_FOUND"));
  assert!(!response.body.to_string().contains("touch"));
}

#[tokio::test]
async fn test_unrepresentable_set_is_type_mismatch() {
  let runtime = runtime(
    json!({
      "workflow_id": "store",
      "name": "Store",
      "start_at": "put_item",
      "nodes": [{
        "node_id": "put_item",
        "type": "service_call",
        "operation": "put",
        "item": {
          "pk": {"path": "$.pk"},
          "tags": {"path": "$.tags", "as": "string_set"},
        },
      }],
    }),
    TaskRegistry::new(),
    InMemoryRecordStore::new(schema()),
  );
  let gateway = Gateway::new(runtime, InputSchema::new(), ResponseConfig::default());

  let response = gateway
    .handle(
      r#"{"pk": "A1", "tags": [{"nested": true}]}"#,
      CancellationToken::new(),
    )
    .await;

  assert_eq!(response.status, 422);
  assert_eq!(response.error_code(), Some("TYPE_MISMATCH"));
}

#[tokio::test]
async fn test_task_failure_is_node_execution_failed() {
  let runtime = runtime(
    json!({
      "workflow_id": "fail",
      "name": "Fail",
      "start_at": "call",
      "nodes": [{"node_id": "call", "type": "task", "function": "broken"}],
    }),
    TaskRegistry::new().with(
      "broken",
      FnTask::new(|_| Err(TaskError::Transport("connection refused".into()))),
    ),
    InMemoryRecordStore::new(schema()),
  );
  let gateway = Gateway::new(runtime, InputSchema::new(), ResponseConfig::default());

  let response = gateway.handle("{}", CancellationToken::new()).await;

  assert_eq!(response.status, 502);
  assert_eq!(response.error_code(), Some("NODE_EXECUTION_FAILED"));
}

#[tokio::test]
async fn test_cancelled_request() {
  let (gateway, _) = translate_gateway(ResponseConfig::default());
  let cancel = CancellationToken::new();
  cancel.cancel();

  let response = gateway.handle(r#"{"text": "hola"}"#, cancel).await;

  assert_eq!(response.status, 503);
  assert_eq!(response.error_code(), Some("CANCELLED"));
}
