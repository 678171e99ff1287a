// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles GET /health, POST /webhooks/evolution and POST /v1/messages.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use wagate_core::{EventSink, InboundMessage, RealtimeEvent};
use wagate_whatsapp::{WebhookEvent, parse_webhook};

use crate::server::GatewayState;

/// Header selecting the tenant of a webhook delivery.
pub const TENANT_HEADER: &str = "x-tenant";

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Acknowledgement returned to the bridge for every webhook delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

/// Request body for POST /v1/messages.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Destination phone number, optionally with a leading `+`.
    pub to: String,
    pub text: String,
    /// Bridge instance; defaults to the configured one.
    #[serde(default)]
    pub instance: Option<String>,
}

/// Response body for POST /v1/messages.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message_id: String,
    pub to: String,
    pub instance: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// GET /health (unauthenticated).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// E.164-like: optional `+`, a non-zero digit, then 1 to 14 more digits.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let mut chars = digits.chars();
    matches!(chars.next(), Some('1'..='9'))
        && (2..=15).contains(&digits.len())
        && chars.all(|c| c.is_ascii_digit())
}

/// POST /webhooks/evolution (unauthenticated; the bridge cannot send tokens).
///
/// Always answers 200 so the bridge does not retry.
pub async fn post_evolution_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let ack = |error: Option<String>| {
        Json(WebhookAck {
            success: error.is_none(),
            error,
            timestamp: Utc::now().to_rfc3339(),
        })
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "webhook body is not JSON");
            return ack(Some(format!("invalid JSON: {e}")));
        }
    };

    let tenant_id = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(&state.default_tenant)
        .to_string();

    match parse_webhook(&payload) {
        WebhookEvent::Message { id, from, text, .. } => {
            debug!(%tenant_id, %from, "inbound message");
            state.bus.publish(
                &tenant_id,
                RealtimeEvent::MessageReceived {
                    from: from.clone(),
                    text: text.clone(),
                },
            );
            let inbound = InboundMessage {
                id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                tenant_id,
                from,
                text,
                received_at: Utc::now(),
            };
            if let Err(e) = state.inbound_tx.send(inbound).await {
                error!(error = %e, "bot loop not accepting messages");
                return ack(Some("bot loop not accepting messages".into()));
            }
        }
        WebhookEvent::ConnectionUpdate { instance, status } => {
            let instance = instance.unwrap_or_else(|| state.instance.clone());
            info!(%tenant_id, %instance, %status, "connection update");
            state
                .bus
                .publish(&tenant_id, RealtimeEvent::ConnectionChanged { instance, status });
        }
        WebhookEvent::QrCode { instance, qr_code } => {
            let instance = instance.unwrap_or_else(|| state.instance.clone());
            info!(%tenant_id, %instance, "QR code update");
            state
                .bus
                .publish(&tenant_id, RealtimeEvent::QrReady { instance, qr_code });
        }
        WebhookEvent::Ignored { event } => {
            debug!(%tenant_id, event = %event, "unhandled webhook event");
        }
    }

    ack(None)
}

/// POST /v1/messages: send a text through the bridge.
pub async fn post_messages(
    State(state): State<GatewayState>,
    Json(body): Json<SendRequest>,
) -> Response {
    if !is_valid_phone(&body.to) {
        return error_response(StatusCode::BAD_REQUEST, "invalid phone number format");
    }
    if body.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "text must not be empty");
    }

    let instance = body.instance.unwrap_or_else(|| state.instance.clone());
    match state.bridge.send_text(&instance, &body.to, &body.text).await {
        Ok(id) => Json(SendResponse {
            message_id: id.0,
            to: body.to,
            instance,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, %instance, "outbound send failed");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
