// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests for the gateway endpoints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use wagate_bus::EventBus;
use wagate_core::{ConnectionStatus, InboundMessage, RealtimeEvent};
use wagate_gateway::auth::AuthConfig;
use wagate_gateway::server::{GatewayState, router};
use wagate_test_utils::MockBridge;

const TOKEN: &str = "test-token";

struct Fixture {
    state: GatewayState,
    bridge: Arc<MockBridge>,
    inbound_rx: mpsc::Receiver<InboundMessage>,
}

fn fixture(token: Option<&str>) -> Fixture {
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let bridge = Arc::new(MockBridge::new());
    let state = GatewayState {
        inbound_tx,
        bridge: bridge.clone(),
        bus: EventBus::default(),
        auth: AuthConfig {
            bearer_token: token.map(str::to_string),
        },
        default_tenant: "mvp".into(),
        instance: "wa-mvp".into(),
        start_time: Instant::now(),
    };
    Fixture {
        state,
        bridge,
        inbound_rx,
    }
}

fn webhook(body: &Value, tenant: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/webhooks/evolution").header("content-type", "application/json");
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant", tenant);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn send_request(body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/v1/messages").header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let f = fixture(None);
    let response = router(f.state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn webhook_message_reaches_bot_loop_under_header_tenant() {
    let mut f = fixture(Some(TOKEN));
    let mut realtime = f.state.bus.subscribe("acme");
    let body = json!({
        "event": "messages.upsert",
        "instance": "wa-acme",
        "data": {
            "key": {"remoteJid": "5215550001@s.whatsapp.net", "fromMe": false, "id": "MSG1"},
            "message": {"conversation": "hola"}
        }
    });

    let response = router(f.state.clone())
        .oneshot(webhook(&body, Some("acme")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);

    let inbound = f.inbound_rx.try_recv().unwrap();
    assert_eq!(inbound.id, "MSG1");
    assert_eq!(inbound.tenant_id, "acme");
    assert_eq!(inbound.from, "5215550001");
    assert_eq!(inbound.text, "hola");

    let event = tokio::time::timeout(Duration::from_secs(1), realtime.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event.event, RealtimeEvent::MessageReceived { .. }));
}

#[tokio::test]
async fn webhook_without_header_uses_default_tenant() {
    let mut f = fixture(Some(TOKEN));
    let body = json!({
        "event": "messages.upsert",
        "data": {"key": {"remoteJid": "5215550009@s.whatsapp.net"}, "message": {"conversation": "menu"}}
    });

    router(f.state.clone())
        .oneshot(webhook(&body, None))
        .await
        .unwrap();

    assert_eq!(f.inbound_rx.try_recv().unwrap().tenant_id, "mvp");
}

#[tokio::test]
async fn ignored_webhook_is_acknowledged_without_inbound() {
    let mut f = fixture(Some(TOKEN));
    let body = json!({
        "event": "messages.upsert",
        "data": {"key": {"remoteJid": "5215550001@s.whatsapp.net", "fromMe": true}, "message": {"conversation": "echo"}}
    });

    let response = router(f.state.clone())
        .oneshot(webhook(&body, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(f.inbound_rx.try_recv().is_err());
}

#[tokio::test]
async fn malformed_webhook_still_answers_ok() {
    let f = fixture(Some(TOKEN));
    let request = Request::post("/webhooks/evolution")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = router(f.state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("invalid JSON"));
}

#[tokio::test]
async fn connection_update_is_published() {
    let f = fixture(Some(TOKEN));
    let mut realtime = f.state.bus.subscribe("mvp");
    let body = json!({"event": "connection.update", "instance": "wa-mvp", "data": {"state": "open"}});

    router(f.state.clone())
        .oneshot(webhook(&body, None))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), realtime.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.event,
        RealtimeEvent::ConnectionChanged {
            instance: "wa-mvp".into(),
            status: ConnectionStatus::Connected,
        }
    );
}

#[tokio::test]
async fn send_requires_bearer_token() {
    let f = fixture(Some(TOKEN));
    let body = json!({"to": "5215550001", "text": "hola"});

    let missing = router(f.state.clone())
        .oneshot(send_request(&body, None))
        .await
        .unwrap();
    let wrong = router(f.state.clone())
        .oneshot(send_request(&body, Some("nope")))
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(f.bridge.sent_count().await, 0);
}

#[tokio::test]
async fn api_rejects_everything_without_configured_token() {
    let f = fixture(None);
    let body = json!({"to": "5215550001", "text": "hola"});

    let response = router(f.state)
        .oneshot(send_request(&body, Some("anything")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn send_delivers_through_bridge() {
    let f = fixture(Some(TOKEN));
    let body = json!({"to": "+5215550001", "text": "Tu cita está confirmada"});

    let response = router(f.state.clone())
        .oneshot(send_request(&body, Some(TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reply = json_body(response).await;
    assert_eq!(reply["instance"], "wa-mvp");
    assert!(reply["message_id"].as_str().unwrap().starts_with("mock-msg-"));

    let sent = f.bridge.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+5215550001");
    assert_eq!(sent[0].body, "Tu cita está confirmada");
}

#[tokio::test]
async fn send_validates_input() {
    let f = fixture(Some(TOKEN));

    let bad_phone = router(f.state.clone())
        .oneshot(send_request(&json!({"to": "abc", "text": "hola"}), Some(TOKEN)))
        .await
        .unwrap();
    let blank_text = router(f.state.clone())
        .oneshot(send_request(&json!({"to": "5215550001", "text": "  "}), Some(TOKEN)))
        .await
        .unwrap();

    assert_eq!(bad_phone.status(), StatusCode::BAD_REQUEST);
    assert_eq!(blank_text.status(), StatusCode::BAD_REQUEST);
    assert_eq!(f.bridge.sent_count().await, 0);
}

#[tokio::test]
async fn bridge_failure_maps_to_bad_gateway() {
    let f = fixture(Some(TOKEN));
    f.bridge.fail_sends(true);

    let response = router(f.state)
        .oneshot(send_request(&json!({"to": "5215550001", "text": "hola"}), Some(TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
