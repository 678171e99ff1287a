// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging bridge capturing every outbound text.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use wagate_core::{
    AdapterType, ConnectionStatus, HealthStatus, InstanceInfo, MessageId, MessagingBridge,
    PluginAdapter, WagateError,
};

/// One captured `send_text` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub instance: String,
    pub to: String,
    pub body: String,
}

/// A bridge that records sends instead of delivering them.
///
/// `fail_sends(true)` makes every subsequent `send_text` fail with a bridge
/// error, for exercising degraded turns.
#[derive(Debug, Default)]
pub struct MockBridge {
    sent: Mutex<Vec<SentText>>,
    failing: AtomicBool,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All captured sends, oldest first.
    pub async fn sent(&self) -> Vec<SentText> {
        self.sent.lock().await.clone()
    }

    /// Bodies sent to `to`, oldest first.
    pub async fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| s.to == to)
            .map(|s| s.body.clone())
            .collect()
    }

    /// Most recent body sent to `to`.
    pub async fn last_to(&self, to: &str) -> Option<String> {
        self.sent_to(to).await.pop()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl PluginAdapter for MockBridge {
    fn name(&self) -> &str {
        "mock-bridge"
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
impl MessagingBridge for MockBridge {
    async fn send_text(
        &self,
        instance: &str,
        to: &str,
        body: &str,
    ) -> Result<MessageId, WagateError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(WagateError::bridge("mock bridge is failing"));
        }
        self.sent.lock().await.push(SentText {
            instance: instance.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }

    async fn create_instance(
        &self,
        instance: &str,
        _webhook_url: Option<&str>,
    ) -> Result<InstanceInfo, WagateError> {
        Ok(InstanceInfo {
            instance_name: instance.to_string(),
            instance_id: Some(format!("mock-{instance}")),
            status: ConnectionStatus::Connecting,
            qr_code: None,
        })
    }

    async fn connection_status(&self, _instance: &str) -> Result<ConnectionStatus, WagateError> {
        Ok(ConnectionStatus::Connected)
    }

    async fn qr_code(&self, _instance: &str) -> Result<Option<String>, WagateError> {
        Ok(None)
    }

    async fn delete_instance(&self, _instance: &str) -> Result<(), WagateError> {
        Ok(())
    }
}
