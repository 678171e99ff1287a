// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging bridge trait for the upstream WhatsApp bridge service.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ConnectionStatus, InstanceInfo, MessageId};

/// Outbound messaging and instance lifecycle against the bridge.
///
/// The conversation core only uses [`MessagingBridge::send_text`]; the
/// lifecycle calls serve the CLI and operator tooling.
#[async_trait]
pub trait MessagingBridge: PluginAdapter {
    /// Sends a text message from `instance` to the phone number `to`.
    async fn send_text(
        &self,
        instance: &str,
        to: &str,
        body: &str,
    ) -> Result<MessageId, WagateError>;

    /// Creates an instance and points its webhook at `webhook_url` when given.
    async fn create_instance(
        &self,
        instance: &str,
        webhook_url: Option<&str>,
    ) -> Result<InstanceInfo, WagateError>;

    /// Current connection state of an instance.
    async fn connection_status(&self, instance: &str) -> Result<ConnectionStatus, WagateError>;

    /// Base64 QR code used to pair the instance, if the bridge has one.
    async fn qr_code(&self, instance: &str) -> Result<Option<String>, WagateError>;

    /// Logs out and removes an instance.
    async fn delete_instance(&self, instance: &str) -> Result<(), WagateError>;
}
