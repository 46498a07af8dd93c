//! Tests for HttpTask against a minimal local HTTP server.

use serde_json::json;
use sluice_document::Document;
use sluice_runtime::{HttpTask, TaskError, TaskHandler};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one request: reply with `status` and the result of `respond` applied
/// to the parsed request body.
async fn serve_once(status: u16, respond: fn(serde_json::Value) -> String) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();

  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let body = loop {
      let n = socket.read(&mut chunk).await.unwrap();
      buf.extend_from_slice(&chunk[..n]);

      let text = String::from_utf8_lossy(&buf).to_string();
      if let Some(split) = text.find("\r\n\r\n") {
        let length = text[..split]
          .lines()
          .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name
              .eq_ignore_ascii_case("content-length")
              .then(|| value.trim().parse::<usize>().ok())
              .flatten()
          })
          .unwrap_or(0);
        let start = split + 4;
        if buf.len() >= start + length {
          break buf[start..start + length].to_vec();
        }
      }
      if n == 0 {
        break Vec::new();
      }
    };

    let request: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    let reply = respond(request);
    let response = format!(
      "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
      status,
      reply.len(),
      reply
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.ok();
  });

  format!("http://{}/invoke", addr)
}

#[tokio::test]
async fn test_posts_payload_and_returns_body() {
  let url = serve_once(200, |request| {
    let text = request["input"]["text"].as_str().unwrap_or_default().to_uppercase();
    json!({"translated": text}).to_string()
  })
  .await;

  let task = HttpTask::new(reqwest::Client::new(), &url).unwrap();
  let payload = Document::from(json!({"input": {"text": "hola"}}));

  let result = task.invoke(payload).await.unwrap();
  assert_eq!(result, Document::from(json!({"translated": "HOLA"})));
}

#[tokio::test]
async fn test_non_success_status_is_failure() {
  let url = serve_once(500, |_| json!({"message": "boom"}).to_string()).await;

  let task = HttpTask::new(reqwest::Client::new(), &url).unwrap();
  let err = task.invoke(Document::map()).await.unwrap_err();

  match err {
    TaskError::Failed(message) => assert!(message.starts_with("HTTP 500")),
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
async fn test_invalid_json_response() {
  let url = serve_once(200, |_| "not json".to_string()).await;

  let task = HttpTask::new(reqwest::Client::new(), &url).unwrap();
  let err = task.invoke(Document::map()).await.unwrap_err();

  assert!(matches!(err, TaskError::InvalidResponse(_)));
}

#[test]
fn test_rejects_bad_url() {
  let err = HttpTask::new(reqwest::Client::new(), "not a url").unwrap_err();
  assert!(matches!(err, TaskError::Transport(_)));
}
