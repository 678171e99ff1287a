// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp messaging bridge for wagate, backed by the Evolution API.
//!
//! [`EvolutionBridge`] implements [`MessagingBridge`]. With `bridge.dry_run`
//! set, sends are logged and acknowledged without any HTTP traffic; the
//! instance lifecycle calls always reach the server.

pub mod client;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use wagate_config::model::BridgeConfig;
use wagate_core::{
    AdapterType, ConnectionStatus, HealthStatus, InstanceInfo, MessageId, MessagingBridge,
    PluginAdapter, WagateError,
};

pub use client::EvolutionClient;
pub use webhook::{WebhookEvent, normalize_event, parse_webhook, strip_jid};

/// Evolution API bridge.
pub struct EvolutionBridge {
    client: EvolutionClient,
    dry_run: bool,
}

impl EvolutionBridge {
    pub fn new(config: &BridgeConfig) -> Result<Self, WagateError> {
        let client = EvolutionClient::new(
            &config.base_url,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        if config.dry_run {
            info!("bridge dry-run enabled, outbound messages will not be delivered");
        }
        Ok(Self {
            client,
            dry_run: config.dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl PluginAdapter for EvolutionBridge {
    fn name(&self) -> &str {
        "evolution"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Bridge
    }

    async fn health_check(&self) -> Result<HealthStatus, WagateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagateError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingBridge for EvolutionBridge {
    async fn send_text(
        &self,
        instance: &str,
        to: &str,
        body: &str,
    ) -> Result<MessageId, WagateError> {
        if self.dry_run {
            info!(instance, to, body, "dry run: message not sent");
            return Ok(MessageId(format!("dry_run_{}", uuid::Uuid::new_v4().simple())));
        }

        let id = self.client.send_text(instance, to, body).await?;
        debug!(instance, to, "message sent");
        Ok(MessageId(id.unwrap_or_else(|| {
            format!("msg_{}", uuid::Uuid::new_v4().simple())
        })))
    }

    async fn create_instance(
        &self,
        instance: &str,
        webhook_url: Option<&str>,
    ) -> Result<InstanceInfo, WagateError> {
        let created = self.client.create_instance(instance).await?;
        if let Some(url) = webhook_url {
            self.client.set_webhook(instance, url).await?;
        }
        info!(instance, "instance created");

        Ok(InstanceInfo {
            instance_name: instance.to_string(),
            instance_id: created
                .pointer("/instance/instanceId")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            status: ConnectionStatus::Connecting,
            qr_code: client::qr_from(&created),
        })
    }

    async fn connection_status(&self, instance: &str) -> Result<ConnectionStatus, WagateError> {
        self.client.connection_state(instance).await
    }

    async fn qr_code(&self, instance: &str) -> Result<Option<String>, WagateError> {
        self.client.qr_code(instance).await
    }

    async fn delete_instance(&self, instance: &str) -> Result<(), WagateError> {
        self.client.logout(instance).await?;
        info!(instance, "instance logged out");
        Ok(())
    }
}
