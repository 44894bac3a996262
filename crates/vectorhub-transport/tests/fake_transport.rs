use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use vectorhub_core::VectorHubError;
use vectorhub_transport::{
    CapturingStream, FakeTransport, HttpRequest, HttpResponse, Method, Transport,
};

#[tokio::test]
async fn replays_responses_in_order() {
    let transport = FakeTransport::new();
    transport
        .push_json(200, json!({"first": true}))
        .push_response(HttpResponse::new(404, "missing"));

    let first = transport
        .send(HttpRequest::new(Method::Get, "http://a"))
        .await
        .unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(first.parse_json().unwrap()["first"], true);

    let second = transport
        .send(HttpRequest::new(Method::Get, "http://b"))
        .await
        .unwrap();
    assert_eq!(second.status, 404);
    assert_eq!(second.body, "missing");
    assert!(!second.is_success());
}

#[tokio::test]
async fn exhausted_queue_is_a_transport_error() {
    let transport = FakeTransport::new();
    let err = transport
        .send(HttpRequest::new(Method::Post, "http://a"))
        .await
        .unwrap_err();
    assert!(matches!(err, VectorHubError::Transport(_)));
}

#[tokio::test]
async fn queued_errors_are_returned() {
    let transport = FakeTransport::new();
    transport.push_error(VectorHubError::Transport("deadline exceeded".into()));
    let err = transport
        .send(HttpRequest::new(Method::Get, "http://a"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("deadline exceeded"));
}

#[tokio::test]
async fn records_requests() {
    let transport = FakeTransport::new();
    transport.push_json(200, json!({}));
    let request = HttpRequest::new(Method::Post, "http://host/path")
        .with_header("Token", "t")
        .with_json(json!({"find": {}}));
    transport.send(request).await.unwrap();

    let recorded = transport.last_request().await.unwrap();
    assert_eq!(recorded.method, Method::Post);
    assert_eq!(recorded.url, "http://host/path");
    assert_eq!(recorded.header("token"), Some("t"));
    assert_eq!(recorded.body.as_json(), Some(&json!({"find": {}})));
    assert_eq!(transport.requests().await.len(), 1);
}

#[tokio::test]
async fn stream_chunks_can_be_captured() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_stream_chunks(vec![
        Bytes::from_static(b"The answer "),
        Bytes::from_static(b"is 42."),
    ]);
    let stream = transport
        .send_stream(HttpRequest::new(Method::Post, "http://chat"))
        .await
        .unwrap();
    let mut capturing = CapturingStream::new(stream);
    let text = capturing.read_to_string().await.unwrap();
    assert_eq!(text, "The answer is 42.");
    assert_eq!(capturing.answer(), "The answer is 42.");
}
