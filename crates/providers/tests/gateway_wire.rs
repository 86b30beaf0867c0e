//! Gateway behaviour against real HTTP endpoints on loopback.

use axum::routing::post;
use axum::{Json, Router};
use chatwithyou_core::message::ChatMessage;
use chatwithyou_core::provider::{Provider, ProviderRequest};
use chatwithyou_core::FailureKind;
use chatwithyou_providers::{CompletionGateway, OpenAiCompatProvider};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn slow_endpoint() -> Router {
    Router::new().route(
        "/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(serde_json::json!({"choices": [{"message": {"content": "too late"}}]}))
        }),
    )
}

fn ok_endpoint() -> Router {
    Router::new().route(
        "/chat/completions",
        post(|| async { Json(serde_json::json!({"choices": [{"message": {"content": "ok"}}]})) }),
    )
}

fn request() -> ProviderRequest {
    ProviderRequest::new(vec![
        ChatMessage::system("你现在要扮演李白。"),
        ChatMessage::user("写一句诗"),
    ])
}

#[tokio::test]
async fn primary_timeout_falls_back_to_secondary() {
    let slow = spawn(slow_endpoint()).await;
    let fast = spawn(ok_endpoint()).await;

    let gateway = CompletionGateway::new("gateway")
        .add_primary(
            Arc::new(OpenAiCompatProvider::new("primary", format!("http://{slow}"), "k1")),
            "gpt-4o-mini",
            Duration::from_millis(200),
        )
        .add(
            Arc::new(OpenAiCompatProvider::new("secondary", format!("http://{fast}"), "k2")),
            "deepseek-v3",
            Duration::from_secs(5),
        );

    let response = gateway.complete(request()).await.unwrap();
    assert_eq!(response.content, "ok");
}

#[tokio::test]
async fn both_failing_surfaces_last_classified_error() {
    let slow = spawn(slow_endpoint()).await;
    let broken = spawn(Router::new().route(
        "/chat/completions",
        post(|| async { Json(serde_json::json!({"unexpected": true})) }),
    ))
    .await;

    let gateway = CompletionGateway::new("gateway")
        .add(
            Arc::new(OpenAiCompatProvider::new("slow", format!("http://{slow}"), "k")),
            "m",
            Duration::from_millis(100),
        )
        .add(
            Arc::new(OpenAiCompatProvider::new("broken", format!("http://{broken}"), "k")),
            "m",
            Duration::from_secs(5),
        );

    let err = gateway.complete(request()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::MalformedResponse);
}

#[tokio::test]
async fn empty_content_falls_back_to_secondary() {
    let empty = spawn(Router::new().route(
        "/chat/completions",
        post(|| async { Json(serde_json::json!({"choices": [{"message": {"content": ""}}]})) }),
    ))
    .await;
    let fast = spawn(ok_endpoint()).await;

    let gateway = CompletionGateway::new("gateway")
        .add_primary(
            Arc::new(OpenAiCompatProvider::new("primary", format!("http://{empty}"), "k1")),
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .add(
            Arc::new(OpenAiCompatProvider::new("secondary", format!("http://{fast}"), "k2")),
            "deepseek-v3",
            Duration::from_secs(5),
        );

    let response = gateway.complete(request()).await.unwrap();
    assert_eq!(response.content, "ok");
}
