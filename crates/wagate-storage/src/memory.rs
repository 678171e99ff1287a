// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process conversation state store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use wagate_core::{ConversationState, StateKey, StateStore, WagateError};

/// Conversation state kept in a sharded concurrent map.
///
/// Different keys never contend. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: DashMap<String, ConversationState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &StateKey) -> Result<Option<ConversationState>, WagateError> {
        Ok(self.states.get(key.as_str()).map(|entry| entry.clone()))
    }

    async fn set(
        &self,
        key: &StateKey,
        mut state: ConversationState,
    ) -> Result<ConversationState, WagateError> {
        state.updated_at = Utc::now().timestamp_millis();
        self.states.insert(key.0.clone(), state.clone());
        Ok(state)
    }

    async fn clear(&self, key: &StateKey) -> Result<(), WagateError> {
        self.states.remove(key.as_str());
        Ok(())
    }
}
