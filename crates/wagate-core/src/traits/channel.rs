// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound channel trait: the source of user messages for the dispatch loop.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::InboundMessage;

/// A source of inbound end-user messages (webhook intake, test injection).
///
/// Replies do not flow back through the channel; they go out through a
/// [`crate::traits::MessagingBridge`].
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Starts accepting messages.
    async fn connect(&mut self) -> Result<(), WagateError>;

    /// Receives the next inbound message. Errors once the channel is closed.
    async fn receive(&self) -> Result<InboundMessage, WagateError>;
}
