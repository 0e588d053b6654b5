//! HTTP surface tests driven through the router without binding a socket.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use agent_outbox::config::{
    ChatApiConfig, ConnectivityConfig, CoordinatorConfig, LogConfig, ResyncConfig,
    ServerConfig, Settings, StorageConfig,
};
use agent_outbox::sender::{ChatReply, ChatSender, DeliveryError};
use agent_outbox::server::{create_app, AppState};
use agent_outbox::storage::MemoryKeyValueStore;

#[derive(Default)]
struct FakeSender {
    sent: Mutex<Vec<String>>,
    network_down: bool,
}

#[async_trait]
impl ChatSender for FakeSender {
    async fn send(&self, message: &str) -> Result<ChatReply, DeliveryError> {
        self.sent.lock().unwrap().push(message.to_string());
        if self.network_down {
            return Err(DeliveryError::Network("connection refused".to_string()));
        }
        if message == "reject me" {
            return Err(DeliveryError::Rejected {
                status: 422,
                message: "Unsupported request".to_string(),
            });
        }
        Ok(ChatReply(json!({"reply": format!("noted: {}", message)})))
    }
}

fn settings(initial_online: bool, max_items: Option<usize>) -> Settings {
    Settings {
        server: ServerConfig::default(),
        chat_api: ChatApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            chat_path: "/api/v1/agent/chat".to_string(),
            token: None,
            timeout_ms: 1_000,
        },
        storage: StorageConfig {
            backend: "memory".to_string(),
            max_items,
            ..Default::default()
        },
        connectivity: ConnectivityConfig {
            probe_enabled: false,
            initial_online,
            ..Default::default()
        },
        resync: ResyncConfig::default(),
        coordinator: CoordinatorConfig::default(),
        log: LogConfig::default(),
    }
}

fn app_with(settings: Settings, sender: Arc<FakeSender>) -> (Router, AppState) {
    let state = AppState::with_components(
        &settings,
        Arc::new(MemoryKeyValueStore::new()),
        sender,
    )
    .unwrap();
    (create_app(state.clone()), state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_queue_state() {
    let (app, _) = app_with(settings(true, None), Arc::new(FakeSender::default()));

    let (status, body) = call(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["online"], true);
    assert_eq!(body["queue"]["backend"], "memory");
    assert_eq!(body["queue"]["key"], "agent-message-queue");
    assert_eq!(body["queue"]["depth"], 0);
    assert!(body["queue"].get("max_items").is_none());
}

#[tokio::test]
async fn test_health_reports_queue_capacity() {
    let (app, _) = app_with(settings(false, Some(5)), Arc::new(FakeSender::default()));
    call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "Ăn phở 45k"})),
    )
    .await;

    let (_, body) = call(&app, Method::GET, "/health", None).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["queue"]["depth"], 1);
    assert_eq!(body["queue"]["max_items"], 5);
}

#[tokio::test]
async fn test_online_submit_is_sent_directly() {
    let sender = Arc::new(FakeSender::default());
    let (app, _) = app_with(settings(true, None), sender.clone());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "Cà phê 30k"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "sent");
    assert_eq!(body["response"], json!({"reply": "noted: Cà phê 30k"}));
    assert_eq!(*sender.sent.lock().unwrap(), vec!["Cà phê 30k"]);

    let (_, queue) = call(&app, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(queue["count"], 0);
}

#[tokio::test]
async fn test_rejected_submit_is_error_and_not_queued() {
    let (app, _) = app_with(settings(true, None), Arc::new(FakeSender::default()));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "reject me"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "Unsupported request");

    let (_, queue) = call(&app, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(queue["count"], 0);
}

#[tokio::test]
async fn test_network_failure_falls_back_to_queue() {
    let sender = Arc::new(FakeSender {
        network_down: true,
        ..Default::default()
    });
    let (app, _) = app_with(settings(true, None), sender);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "Tiền điện 800k"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "queued");

    let (_, queue) = call(&app, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(queue["count"], 1);
    assert_eq!(queue["items"][0]["message"], "Tiền điện 800k");
    assert_eq!(queue["items"][0]["id"], body["id"]);
}

#[tokio::test]
async fn test_offline_submit_then_manual_flush() {
    let sender = Arc::new(FakeSender::default());
    let (app, _) = app_with(settings(false, None), sender.clone());

    let (_, first) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "Ăn phở 45k"})),
    )
    .await;
    let (_, second) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "Lương tháng 10 20tr"})),
    )
    .await;
    assert_eq!(first["status"], "queued");
    assert_eq!(second["status"], "queued");
    assert!(sender.sent.lock().unwrap().is_empty());

    // Flush while offline does nothing
    let (status, report) = call(&app, Method::POST, "/api/v1/queue/flush", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({"status": "skipped", "reason": "offline"}));

    let (_, connectivity) = call(
        &app,
        Method::PUT,
        "/api/v1/connectivity",
        Some(json!({"online": true})),
    )
    .await;
    assert_eq!(connectivity, json!({"online": true, "changed": true}));

    // No run loop here, so flush by hand
    let (_, report) = call(&app, Method::POST, "/api/v1/queue/flush", None).await;
    assert_eq!(report, json!({"status": "completed", "delivered": 2, "failed": 0}));
    assert_eq!(
        *sender.sent.lock().unwrap(),
        vec!["Ăn phở 45k", "Lương tháng 10 20tr"]
    );

    let uri = format!("/api/v1/messages/{}", first["id"].as_str().unwrap());
    let (status, message) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message["status"], "sent");
    assert_eq!(message["response"], json!({"reply": "noted: Ăn phở 45k"}));

    let (_, list) = call(&app, Method::GET, "/api/v1/messages", None).await;
    let statuses: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["sent", "sent"]);

    let (_, report) = call(&app, Method::POST, "/api/v1/queue/flush", None).await;
    assert_eq!(report, json!({"status": "skipped", "reason": "empty"}));
}

#[tokio::test]
async fn test_connectivity_update_reports_edges() {
    let (app, state) = app_with(settings(true, None), Arc::new(FakeSender::default()));

    let (_, body) = call(&app, Method::GET, "/api/v1/connectivity", None).await;
    assert_eq!(body, json!({"online": true}));

    let (_, body) = call(
        &app,
        Method::PUT,
        "/api/v1/connectivity",
        Some(json!({"online": true})),
    )
    .await;
    assert_eq!(body, json!({"online": true, "changed": false}));

    let mut events = state.connectivity.subscribe();
    let (_, body) = call(
        &app,
        Method::PUT,
        "/api/v1/connectivity",
        Some(json!({"online": false})),
    )
    .await;
    assert_eq!(body, json!({"online": false, "changed": true}));
    assert!(events.try_recv().is_ok());
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let (app, _) = app_with(settings(false, None), Arc::new(FakeSender::default()));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, queue) = call(&app, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(queue["count"], 0);
}

#[tokio::test]
async fn test_full_queue_is_rejected() {
    let (app, _) = app_with(settings(false, Some(1)), Arc::new(FakeSender::default()));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "first"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "second"})),
    )
    .await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    assert_eq!(body["error"]["code"], "QUEUE_FULL");

    let (_, queue) = call(&app, Method::GET, "/api/v1/queue", None).await;
    assert_eq!(queue["count"], 1);
}

#[tokio::test]
async fn test_unknown_message_is_not_found() {
    let (app, _) = app_with(settings(true, None), Arc::new(FakeSender::default()));

    let (status, body) = call(&app, Method::GET, "/api/v1/messages/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_route_returns_json_not_found() {
    let (app, _) = app_with(settings(true, None), Arc::new(FakeSender::default()));

    let (status, body) = call(&app, Method::GET, "/api/v1/outbox", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "No route for GET /api/v1/outbox");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_outbox_metrics() {
    let (app, _) = app_with(settings(false, None), Arc::new(FakeSender::default()));
    call(
        &app,
        Method::POST,
        "/api/v1/messages",
        Some(json!({"message": "count me"})),
    )
    .await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("agent_outbox_queue_depth"));
    assert!(text.contains("agent_outbox_queue_enqueued_total"));
}

#[tokio::test]
async fn test_invalid_overlap_policy_is_rejected() {
    let mut settings = settings(true, None);
    settings.resync.overlap_policy = "parallel".to_string();

    let result = AppState::with_components(
        &settings,
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(FakeSender::default()),
    );
    assert!(result.is_err());
}
