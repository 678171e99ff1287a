// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway implementing ChannelAdapter.
//!
//! The gateway receives bridge webhooks, turns inbound text into
//! [`InboundMessage`]s for the bot loop, accepts authenticated outbound sends,
//! and streams realtime tenant events over SSE.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod sse;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use wagate_bus::EventBus;
use wagate_core::{
    AdapterType, ChannelAdapter, HealthStatus, InboundMessage, MessagingBridge, PluginAdapter,
    WagateError,
};

use crate::auth::AuthConfig;
use crate::server::{GatewayState, ServerConfig};

/// Gateway channel adapter configuration.
#[derive(Clone)]
pub struct GatewayChannelConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for /v1 routes. `None` rejects every /v1 request.
    pub bearer_token: Option<String>,
    /// Tenant for webhook deliveries without an `x-tenant` header.
    pub default_tenant: String,
    /// Bridge instance used when a request names none.
    pub instance: String,
    pub inbound_buffer: usize,
}

impl std::fmt::Debug for GatewayChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayChannelConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .field("default_tenant", &self.default_tenant)
            .field("instance", &self.instance)
            .field("inbound_buffer", &self.inbound_buffer)
            .finish()
    }
}

/// HTTP gateway implementing ChannelAdapter.
///
/// The axum server runs as a background task. The webhook handler pushes
/// inbound messages onto an mpsc channel that `receive()` drains.
pub struct GatewayChannel {
    config: GatewayChannelConfig,
    bridge: Arc<dyn MessagingBridge>,
    bus: EventBus,
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    server_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl GatewayChannel {
    pub fn new(config: GatewayChannelConfig, bridge: Arc<dyn MessagingBridge>, bus: EventBus) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_buffer.max(1));
        Self {
            config,
            bridge,
            bus,
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            server_handle: Mutex::new(None),
        }
    }

    /// Handler state sharing this channel's inbound queue.
    pub fn state(&self) -> GatewayState {
        GatewayState {
            inbound_tx: self.inbound_tx.clone(),
            bridge: Arc::clone(&self.bridge),
            bus: self.bus.clone(),
            auth: AuthConfig {
                bearer_token: self.config.bearer_token.clone(),
            },
            default_tenant: self.config.default_tenant.clone(),
            instance: self.config.instance.clone(),
            start_time: Instant::now(),
        }
    }
}

#[async_trait]
impl PluginAdapter for GatewayChannel {
    fn name(&self) -> &str {
        "gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, WagateError> {
        let handle = self.server_handle.lock().await;
        match handle.as_ref() {
            Some(h) if !h.is_finished() => Ok(HealthStatus::Healthy),
            Some(_) => Ok(HealthStatus::Unhealthy("server stopped".to_string())),
            None => Ok(HealthStatus::Unhealthy("server not started".to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), WagateError> {
        let mut handle = self.server_handle.lock().await;
        if let Some(h) = handle.take() {
            h.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for GatewayChannel {
    async fn connect(&mut self) -> Result<(), WagateError> {
        let server_config = ServerConfig {
            host: self.config.host.clone(),
            port: self.config.port,
        };
        let state = self.state();

        let handle = tokio::spawn(async move {
            if let Err(e) = server::start_server(&server_config, state).await {
                tracing::error!("gateway server error: {e}");
            }
        });

        let mut server_handle = self.server_handle.lock().await;
        *server_handle = Some(handle);

        tracing::info!(
            "Gateway channel connected on {}:{}",
            self.config.host,
            self.config.port
        );
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, WagateError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| WagateError::bridge("gateway inbound channel closed"))
    }
}
