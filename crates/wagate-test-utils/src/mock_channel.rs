// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inbound channel for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify};

use wagate_core::{
    AdapterType, ChannelAdapter, HealthStatus, InboundMessage, PluginAdapter, WagateError,
};

/// Inbound channel fed by [`MockChannel::inject`].
///
/// Clones share the same queue, so a test can keep a handle after moving
/// one into a dispatch loop. After [`MockChannel::close`] the queue drains
/// and `receive` reports a closed channel.
#[derive(Clone, Default)]
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    notify: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn inject(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Inject a text from `from` for `tenant_id`.
    pub async fn inject_text(&self, tenant_id: &str, from: &str, text: &str) {
        self.inject(InboundMessage {
            id: format!("mock-in-{}", uuid::Uuid::new_v4()),
            tenant_id: tenant_id.to_string(),
            from: from.to_string(),
            text: text.to_string(),
            received_at: Utc::now(),
        })
        .await;
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub async fn pending(&self) -> usize {
        self.inbound.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, WagateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagateError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), WagateError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundMessage, WagateError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(WagateError::bridge("inbound channel closed"));
            }
            self.notify.notified().await;
        }
    }
}
