use super::*;
use anyhow::anyhow;
use async_trait::async_trait;
use axum::{body, body::Body, http::Request};
use client_core::{
    config::ClientSettings, ActiveTabSource, ChatView, HttpQaBackend, SessionController,
};
use shared::domain::{ChatMessage, SessionStatus};
use tower::ServiceExt;

use crate::{config::Settings, page::PageDocument, page::PageFetcher};

struct StubFetcher;

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<PageDocument> {
        if url.contains("unreachable") {
            return Err(anyhow!("dns error: no such host"));
        }
        Ok(extract_page(url))
    }
}

fn extract_page(url: &str) -> PageDocument {
    page::extract_document(
        url,
        "<html><head><title>Cooking blog</title></head><body>\
         <p>This post explains how to bake sourdough bread at home.</p>\
         <p>The starter needs feeding every twelve hours.</p></body></html>",
    )
}

fn test_app() -> Router {
    let api = ApiContext::new(Arc::new(StubFetcher), &Settings::default());
    build_router(Arc::new(AppState { api }))
}

async fn post_json(
    app: &Router,
    uri: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn home_and_healthz_respond() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let dto: StatusResponse = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(dto.message, "RAG Chatbot API is running");

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn load_url_and_ask_routes_work() {
    let app = test_app();
    let (status, body) = post_json(
        &app,
        "/load-url",
        serde_json::json!({ "session_id": "session_1_abc", "url": "https://blog.example/sourdough" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "URL loaded and session initialized");

    let (status, body) = post_json(
        &app,
        "/ask",
        serde_json::json!({ "session_id": "session_1_abc", "question": "How often does the starter need feeding?" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "The starter needs feeding every twelve hours.");
}

#[tokio::test]
async fn ask_unknown_session_returns_400_with_detail() {
    let app = test_app();
    let (status, body) = post_json(
        &app,
        "/ask",
        serde_json::json!({ "session_id": "session_9_zzz", "question": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Session not found. Load a URL first.");
}

#[tokio::test]
async fn load_url_failure_returns_500_with_detail() {
    let app = test_app();
    let (status, body) = post_json(
        &app,
        "/load-url",
        serde_json::json!({ "session_id": "session_1_abc", "url": "https://unreachable.example" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("no such host"));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = test_app();
    let (status, _) = post_json(&app, "/ask", serde_json::json!({ "question": "hi" })).await;
    assert!(status.is_client_error());
}

struct FixedTab(&'static str);

#[async_trait]
impl ActiveTabSource for FixedTab {
    async fn active_tab_url(&self) -> Option<String> {
        Some(self.0.to_string())
    }
}

struct SilentView;

impl ChatView for SilentView {
    fn render_message(&self, _message: &ChatMessage) {}
    fn show_typing(&self) {}
    fn hide_typing(&self) {}
    fn set_status(&self, _status: SessionStatus, _label: &str) {}
    fn set_retry_visible(&self, _visible: bool) {}
    fn set_input_enabled(&self, _enabled: bool) {}
}

#[tokio::test]
async fn session_controller_talks_to_live_server() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, test_app()).await;
    });

    let settings = ClientSettings::default().with_api_base_url(format!("http://{addr}"));
    let controller = SessionController::new(
        Arc::new(HttpQaBackend::new(&settings).expect("backend")),
        Arc::new(FixedTab("https://blog.example/sourdough")),
        Arc::new(SilentView),
    );

    controller.initialize().await;
    assert_eq!(controller.status().await, Some(SessionStatus::Ready));

    assert!(controller.submit_question("What does this post explain?").await);
    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.transcript.last(),
        Some(&ChatMessage::bot(
            "This post explains how to bake sourdough bread at home."
        ))
    );
}
