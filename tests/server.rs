//! HTTP-surface contract in transient ("in-memory") mode, exercised over a
//! real listener with reqwest.

use kindred::Config;
use kindred::server::run_server_with_listener;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

struct TestServer {
    port: u16,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral listener should bind");
        let port = listener
            .local_addr()
            .expect("ephemeral listener should expose local address")
            .port();

        // No database, no generation credential: in-memory mode, fallback path.
        let config = Config::default();
        let handle = tokio::spawn(async move { run_server_with_listener(listener, config).await });

        wait_until_ready(port).await;

        Self { port, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{path}", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("server did not become ready on port {port}");
}

#[tokio::test]
async fn health_reports_in_memory_mode() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/health"))
        .send()
        .await
        .expect("health request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("health body should be json");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["persistence"], "in-memory");
}

#[tokio::test]
async fn companions_list_serves_samples() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/api/companions"))
        .send()
        .await
        .expect("companions request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("companions body should be json");
    assert_eq!(body["success"], true);
    assert_eq!(body["persistence"], "in-memory");
    assert_eq!(body["total"], 2);
    assert_eq!(body["companions"][0]["name"], "Ari");
    assert_eq!(body["companions"][1]["name"], "Nova");
    assert!(body["companions"][0]["createdAt"].is_string());
}

#[tokio::test]
async fn companion_create_validates_and_returns_profile() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let missing_fields = client
        .post(server.url("/api/companions"))
        .json(&serde_json::json!({"name": "Echo"}))
        .send()
        .await
        .expect("invalid create should complete");
    assert_eq!(missing_fields.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing_fields.json().await.expect("error body should be json");
    assert_eq!(body["error"], "name, archetype, and tone are required");

    let created = client
        .post(server.url("/api/companions"))
        .json(&serde_json::json!({
            "name": "Echo",
            "archetype": "Patient listener",
            "tone": "grounded",
        }))
        .send()
        .await
        .expect("create should complete");
    assert_eq!(created.status(), StatusCode::OK);

    let body: Value = created.json().await.expect("create body should be json");
    assert_eq!(body["success"], true);
    assert_eq!(body["persistence"], "in-memory");
    assert_eq!(body["companion"]["name"], "Echo");
    assert_eq!(body["companion"]["tone"], "grounded");
    assert_eq!(body["companion"]["visibility"], "private");
    assert_eq!(body["companion"]["boundaries"][0], "No harmful content");
    assert!(
        body["companion"]["id"]
            .as_str()
            .is_some_and(|id| id.starts_with("comp-"))
    );
}

#[tokio::test]
async fn chat_falls_back_deterministically_without_credential() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/chat"))
        .json(&serde_json::json!({
            "companionName": "Ari",
            "messages": [{"role": "user", "content": "I feel stuck today"}],
        }))
        .send()
        .await
        .expect("chat request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("chat body should be json");
    assert_eq!(body["success"], true);
    assert_eq!(body["persistence"], "in-memory");
    assert_eq!(body["response"]["role"], "assistant");
    assert_eq!(
        body["response"]["content"],
        "Ari: I hear you. You said: \"I feel stuck today\". Let's unpack this one step at a time."
    );
    assert_eq!(body["model"], "fallback-template");
}

#[tokio::test]
async fn chat_appends_message_field_to_window() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/chat"))
        .json(&serde_json::json!({
            "companionName": "Nova",
            "message": "  can we brainstorm?  ",
        }))
        .send()
        .await
        .expect("chat request should complete");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("chat body should be json");
    assert_eq!(
        body["response"]["content"],
        "Nova: I hear you. You said: \"can we brainstorm?\". Let's unpack this one step at a time."
    );
}

#[tokio::test]
async fn chat_without_messages_is_rejected() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let empty = client
        .post(server.url("/api/chat"))
        .json(&serde_json::json!({"companionName": "Ari"}))
        .send()
        .await
        .expect("empty chat request should complete");
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body: Value = empty.json().await.expect("error body should be json");
    assert_eq!(body["error"], "messages are required");

    let blank = client
        .post(server.url("/api/chat"))
        .json(&serde_json::json!({"companionName": "Ari", "message": "   "}))
        .send()
        .await
        .expect("blank chat request should complete");
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_rejects_invalid_json() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/chat"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("invalid json request should complete");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("error body should be json");
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|msg| msg.contains("Invalid JSON"))
    );
}

#[tokio::test]
async fn session_endpoints_degrade_without_database() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let current = client
        .get(server.url("/api/auth/session"))
        .send()
        .await
        .expect("session get should complete");
    assert_eq!(current.status(), StatusCode::OK);
    let body: Value = current.json().await.expect("session body should be json");
    assert_eq!(body["success"], true);
    assert_eq!(body["persistence"], "in-memory");
    assert!(body["user"].is_null());

    let create = client
        .post(server.url("/api/auth/session"))
        .json(&serde_json::json!({"email": "a@example.com"}))
        .send()
        .await
        .expect("session post should complete");
    assert_eq!(create.status(), StatusCode::BAD_REQUEST);
    let body: Value = create.json().await.expect("error body should be json");
    assert_eq!(body["error"], "session auth requires a configured database");

    let delete = client
        .delete(server.url("/api/auth/session"))
        .send()
        .await
        .expect("session delete should complete");
    assert_eq!(delete.status(), StatusCode::OK);
    let set_cookie = delete
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("session delete should clear the cookie");
    assert!(set_cookie.starts_with("cp_user=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn conversation_routes_return_empty_without_database() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let conversations = client
        .get(server.url("/api/conversations"))
        .send()
        .await
        .expect("conversations request should complete");
    assert_eq!(conversations.status(), StatusCode::OK);
    let body: Value = conversations
        .json()
        .await
        .expect("conversations body should be json");
    assert_eq!(body["persistence"], "in-memory");
    assert_eq!(body["conversations"], serde_json::json!([]));

    let messages = client
        .get(server.url("/api/conversations/conv-123/messages"))
        .send()
        .await
        .expect("messages request should complete");
    assert_eq!(messages.status(), StatusCode::OK);
    let body: Value = messages.json().await.expect("messages body should be json");
    assert_eq!(body["messages"], serde_json::json!([]));
}
