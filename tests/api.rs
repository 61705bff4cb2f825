use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };

use ask_relay::agent::ChatAgent;
use ask_relay::history::{ HistoryStore, JsonFileHistoryStore };
use ask_relay::llm::chat::{ ChatGateway, ChatSession, GatewayError };
use ask_relay::llm::GenerationConfig;
use ask_relay::models::chat::Turn;
use ask_relay::server::api::router;
use async_trait::async_trait;
use axum::body::{ to_bytes, Body };
use axum::http::{ Request, StatusCode };
use axum::Router;
use serde_json::{ json, Value };
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Clone)]
struct FakeGateway {
    reply: Result<String, String>,
    calls: Arc<AtomicUsize>,
    seen_history: Arc<Mutex<Vec<Vec<Turn>>>>,
}

impl FakeGateway {
    fn answering(answer: &str) -> Self {
        Self {
            reply: Ok(answer.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
            seen_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(body: &str) -> Self {
        Self { reply: Err(body.to_string()), ..Self::answering("") }
    }
}

struct FakeSession {
    gateway: FakeGateway,
}

impl ChatGateway for FakeGateway {
    fn start_session(&self, _config: &GenerationConfig, history: &[Turn]) -> Box<dyn ChatSession> {
        self.seen_history.lock().unwrap().push(history.to_vec());
        Box::new(FakeSession { gateway: self.clone() })
    }

    fn get_model(&self) -> String {
        "fake-model".to_string()
    }
}

#[async_trait]
impl ChatSession for FakeSession {
    async fn send(&mut self, _prompt: &str) -> Result<String, GatewayError> {
        self.gateway.calls.fetch_add(1, Ordering::SeqCst);
        match &self.gateway.reply {
            Ok(answer) => Ok(answer.clone()),
            Err(body) => Err(GatewayError::Provider { status: 429, body: body.clone() }),
        }
    }
}

struct Harness {
    dir: TempDir,
    store: Arc<JsonFileHistoryStore>,
    app: Router,
}

fn harness(gateway: FakeGateway) -> Harness {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>ask</h1>").unwrap();
    let store = Arc::new(JsonFileHistoryStore::new(dir.path().join("conversation.json"), 10));
    let agent = ChatAgent::new(
        Arc::new(gateway),
        store.clone(),
        GenerationConfig::default()
    );
    let app = router(Arc::new(agent), dir.path());
    Harness { dir, store, app }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn post_ask(app: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/ask")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_history(app: &Router) -> (StatusCode, Value) {
    let request = Request::builder().uri("/history").body(Body::empty()).unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn ask_returns_answer_and_records_exchange() {
    let gateway = FakeGateway::answering("4");
    let h = harness(gateway.clone());

    let (status, body) = post_ask(&h.app, r#"{"prompt": "2+2?"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"answer": "4"}));
    assert_eq!(h.store.load().await, vec![Turn::user("2+2?"), Turn::model("4")]);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ask_seeds_session_with_persisted_history() {
    let gateway = FakeGateway::answering("ok");
    let h = harness(gateway.clone());

    post_ask(&h.app, r#"{"prompt": "first"}"#).await;
    post_ask(&h.app, r#"{"prompt": "second"}"#).await;

    let seen = gateway.seen_history.lock().unwrap().clone();
    assert_eq!(seen[0], Vec::<Turn>::new());
    assert_eq!(seen[1], vec![Turn::user("first"), Turn::model("ok")]);
    assert_eq!(h.store.load().await.len(), 4);
}

#[tokio::test]
async fn blank_prompt_is_rejected_without_gateway_call() {
    let gateway = FakeGateway::answering("unused");
    let h = harness(gateway.clone());

    for body in [r#"{"prompt": ""}"#, r#"{"prompt": "   \n"}"#, r#"{}"#, "not json"] {
        let (status, json_body) = post_ask(&h.app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(json_body, json!({"error": "Prompt is missing."}));
    }

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    assert!(!h.store.path().exists());
}

#[tokio::test]
async fn gateway_failure_is_generic_500_and_log_unchanged() {
    let h = harness(FakeGateway::failing("quota exceeded"));
    h.store.save(&vec![Turn::user("old"), Turn::model("reply")]).await;
    let before = std::fs::read(h.store.path()).unwrap();

    let (status, body) = post_ask(&h.app, r#"{"prompt": "2+2?"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal Server Error"}));
    assert_eq!(std::fs::read(h.store.path()).unwrap(), before);
}

#[tokio::test]
async fn ask_succeeds_over_malformed_history() {
    let h = harness(FakeGateway::answering("fresh"));
    std::fs::write(h.store.path(), "garbage").unwrap();

    let (status, body) = post_ask(&h.app, r#"{"prompt": "hi"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"answer": "fresh"}));
    assert_eq!(h.store.load().await, vec![Turn::user("hi"), Turn::model("fresh")]);
}

#[tokio::test]
async fn history_is_empty_without_file() {
    let h = harness(FakeGateway::answering("unused"));

    let (status, body) = get_history(&h.app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"history": []}));
}

#[tokio::test]
async fn history_returns_storage_native_records() {
    let h = harness(FakeGateway::answering("4"));
    post_ask(&h.app, r#"{"prompt": "2+2?"}"#).await;

    let (status, body) = get_history(&h.app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"history": [
            {"role": "user", "content": "2+2?"},
            {"role": "model", "content": "4"}
        ]})
    );
}

#[tokio::test]
async fn history_reports_unreadable_file() {
    let h = harness(FakeGateway::answering("unused"));
    std::fs::write(h.store.path(), "{ broken").unwrap();

    let (status, body) = get_history(&h.app).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to load history."}));
}

#[tokio::test]
async fn root_serves_index_page() {
    let h = harness(FakeGateway::answering("unused"));

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, bytes) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"<h1>ask</h1>");
    assert!(h.dir.path().join("index.html").exists());
}
