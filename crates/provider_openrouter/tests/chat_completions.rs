use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use config::CompletionSettings;
use core_types::{ChatRole, ChatTurn, CompletionBackend, Language};
use provider_openrouter::{CompletionClient, PROBE_MESSAGE};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Upstream {
    status: StatusCode,
    reply: Value,
    seen: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn chat(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    upstream
        .seen
        .lock()
        .expect("lock")
        .push((headers, body));
    (upstream.status, Json(upstream.reply.clone()))
}

async fn spawn_upstream(status: StatusCode, reply: Value) -> (String, Upstream) {
    let upstream = Upstream {
        status,
        reply,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/api/v1/chat/completions", post(chat))
        .with_state(upstream.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}/api/v1"), upstream)
}

fn client(base_url: String) -> CompletionClient {
    let settings = CompletionSettings {
        base_url,
        referer: "http://campus.test".to_string(),
        ..CompletionSettings::default()
    };
    CompletionClient::new(settings, "sk-or-test").expect("client")
}

fn reply_with(content: &str) -> Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

#[tokio::test]
async fn sends_grounded_request_and_returns_first_choice() {
    let (base, upstream) = spawn_upstream(StatusCode::OK, reply_with("Fees are due on the 15th.")).await;
    let client = client(base);
    client.set_grounding_text("FEES: due on the 15th".to_string());

    let history = vec![
        ChatTurn::new(ChatRole::User, "hello"),
        ChatTurn::new(ChatRole::Assistant, "Hi! How can I help?"),
    ];
    let reply = client
        .respond("When are fees due?", Language::Hi, &history)
        .await
        .expect("reply");
    assert_eq!(reply, "Fees are due on the 15th.");

    let seen = upstream.seen.lock().expect("lock");
    let (headers, body) = &seen[0];
    assert_eq!(headers["authorization"], "Bearer sk-or-test");
    assert_eq!(headers["http-referer"], "http://campus.test");
    assert_eq!(headers["x-title"], "Campus Multilingual Assistant");

    assert_eq!(body["model"], "x-ai/grok-4-fast:free");
    assert_eq!(body["max_tokens"], 1000);
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "system");
    let system = messages[0]["content"].as_str().expect("system text");
    assert!(system.contains("Respond in Hindi (हिंदी)"));
    assert!(system.contains("FEES: due on the 15th"));
    assert_eq!(messages[3]["role"], "user");
    assert_eq!(messages[3]["content"], "When are fees due?");
}

#[tokio::test]
async fn empty_choice_list_is_an_error() {
    let (base, upstream) = spawn_upstream(StatusCode::OK, json!({ "choices": [] })).await;
    let err = client(base)
        .respond("फीस कब देनी है?", Language::Hi, &[])
        .await
        .expect_err("empty choices");
    assert_eq!(err.status, Some(200));
    assert_eq!(err.detail, "no response from model");
    assert_eq!(upstream.seen.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn empty_content_is_an_error() {
    let (base, _upstream) = spawn_upstream(StatusCode::OK, reply_with("   ")).await;
    let err = client(base)
        .respond("hello", Language::En, &[])
        .await
        .expect_err("empty content");
    assert_eq!(err.detail, "empty completion content");
}

#[tokio::test]
async fn server_error_carries_status_without_retry() {
    let (base, upstream) = spawn_upstream(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "upstream down" } }),
    )
    .await;
    let err = client(base)
        .respond("hello", Language::En, &[])
        .await
        .expect_err("500");
    assert_eq!(err.status, Some(500));
    assert!(err.detail.contains("upstream down"));
    assert_eq!(upstream.seen.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let err = client(format!("http://{addr}/api/v1"))
        .respond("hello", Language::En, &[])
        .await
        .expect_err("connection refused");
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn probe_sends_short_test_message() {
    let (base, upstream) = spawn_upstream(StatusCode::OK, reply_with("Hi")).await;
    client(base).probe().await.expect("probe");

    let seen = upstream.seen.lock().expect("lock");
    let body = &seen[0].1;
    assert_eq!(body["max_tokens"], 10);
    assert_eq!(body["messages"][0]["content"], PROBE_MESSAGE);
}

#[tokio::test]
async fn probe_reports_rejected_credential() {
    let (base, _upstream) = spawn_upstream(StatusCode::UNAUTHORIZED, json!({})).await;
    let err = client(base).probe().await.expect_err("401");
    assert_eq!(err.status, Some(401));
}
