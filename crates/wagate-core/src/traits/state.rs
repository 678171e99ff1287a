// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state store trait.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::types::{ConversationState, StateKey};

/// Single-key get/set/clear of per-user conversation state.
///
/// `set` stamps `updated_at` with the current time. Reads observe the
/// caller's own prior writes for the same key.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn get(&self, key: &StateKey) -> Result<Option<ConversationState>, WagateError>;

    /// Stores `state` and returns it as persisted (with the new timestamp).
    async fn set(
        &self,
        key: &StateKey,
        state: ConversationState,
    ) -> Result<ConversationState, WagateError>;

    async fn clear(&self, key: &StateKey) -> Result<(), WagateError>;
}
