// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wagate_bus::EventBus;
use wagate_core::{InboundMessage, MessagingBridge, WagateError};

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, sse};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Channel feeding the bot loop.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    /// Outbound delivery for POST /v1/messages.
    pub bridge: Arc<dyn MessagingBridge>,
    /// Realtime fan-out for webhook events and SSE subscribers.
    pub bus: EventBus,
    pub auth: AuthConfig,
    /// Tenant for webhook deliveries without an `x-tenant` header.
    pub default_tenant: String,
    /// Bridge instance used when a request names none.
    pub instance: String,
    pub start_time: Instant,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the gateway router.
///
/// - GET /health, POST /webhooks/evolution (public)
/// - POST /v1/messages, GET /v1/events (bearer auth)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/webhooks/evolution", post(handlers::post_evolution_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/messages", post(handlers::post_messages))
        .route("/v1/events", get(sse::get_events))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the gateway until the task is aborted.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), WagateError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WagateError::Bridge {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WagateError::Bridge {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
