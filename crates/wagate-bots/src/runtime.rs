// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot runtime: per-message context construction and dispatch.
//!
//! For every inbound message the runtime loads the sender's conversation
//! state, applies the global menu keyword, resolves the active bot and hands
//! it a [`BotContext`]. Handlers reach state and the outbound channel only
//! through that context.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use wagate_config::WagateConfig;
use wagate_core::{
    ConversationState, EventSink, InboundMessage, MessageId, MessagingBridge, RealtimeEvent,
    StateKey, StatePatch, StateStore, WagateError,
};

use crate::handler::TurnOutcome;
use crate::registry::BotRegistry;

/// Nested delegations allowed within one turn.
const MAX_DELEGATION_DEPTH: u8 = 4;

/// Runtime behaviour shared by every turn.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Bot for conversations with no state, and the target of the menu keyword.
    pub default_bot: String,
    /// Bridge instance replies are sent from.
    pub instance: String,
    /// Lowercased reset keywords.
    pub menu_keywords: Vec<String>,
    /// Hold a per-(tenant, user) lock for the duration of each turn.
    pub serialize_per_user: bool,
}

impl RuntimeSettings {
    pub fn from_config(config: &WagateConfig) -> Self {
        Self {
            default_bot: config.service.default_bot.clone(),
            instance: config.bridge.instance_name.clone(),
            menu_keywords: config
                .runtime
                .menu_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            serialize_per_user: config.runtime.serialize_per_user,
        }
    }

    /// Case-insensitive, whitespace-trimmed keyword match.
    pub fn is_menu_keyword(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        self.menu_keywords.iter().any(|k| *k == text)
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&WagateConfig::default())
    }
}

/// Dispatches inbound messages to bot handlers.
pub struct BotRuntime {
    settings: RuntimeSettings,
    states: Arc<dyn StateStore>,
    bridge: Arc<dyn MessagingBridge>,
    registry: Arc<BotRegistry>,
    events: Option<Arc<dyn EventSink>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BotRuntime {
    pub fn new(
        settings: RuntimeSettings,
        states: Arc<dyn StateStore>,
        bridge: Arc<dyn MessagingBridge>,
        registry: Arc<BotRegistry>,
    ) -> Self {
        Self {
            settings,
            states,
            bridge,
            registry,
            events: None,
            locks: DashMap::new(),
        }
    }

    /// Attach a realtime sink handed to every context.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Process one inbound message.
    ///
    /// `Err` is only returned when the conversation state could not be read
    /// or reset before dispatch; handler failures come back as
    /// [`TurnOutcome::Degraded`].
    pub async fn process(&self, inbound: InboundMessage) -> Result<TurnOutcome, WagateError> {
        let key = StateKey::new(&inbound.tenant_id, &inbound.from);

        if !self.settings.serialize_per_user {
            return self.run_turn(key, inbound).await;
        }

        let lock = self.user_lock(&key);
        let result = {
            let _turn = lock.lock().await;
            self.run_turn(key.clone(), inbound).await
        };
        drop(lock);
        // Forget the lock once no other turn for this user is waiting on it.
        self.locks
            .remove_if(key.as_str(), |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of users with a turn in flight or queued.
    pub fn active_users(&self) -> usize {
        self.locks.len()
    }

    fn user_lock(&self, key: &StateKey) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.0.clone()).or_default().value())
    }

    async fn run_turn(
        &self,
        key: StateKey,
        inbound: InboundMessage,
    ) -> Result<TurnOutcome, WagateError> {
        let state = if self.settings.is_menu_keyword(&inbound.text) {
            info!(
                tenant_id = %inbound.tenant_id,
                from = %inbound.from,
                "menu keyword received, resetting conversation"
            );
            let reset = ConversationState::new(self.settings.default_bot.as_str());
            Some(self.states.set(&key, reset).await?)
        } else {
            self.states.get(&key).await?
        };

        let bot_key = state
            .as_ref()
            .map(|s| s.bot_key.clone())
            .unwrap_or_else(|| self.settings.default_bot.clone());
        let handler = self.registry.resolve(&bot_key);
        debug!(
            tenant_id = %inbound.tenant_id,
            from = %inbound.from,
            bot_key = %bot_key,
            handler = handler.key(),
            fsm = state.as_ref().and_then(|s| s.fsm.as_deref()),
            "dispatching turn"
        );

        let mut ctx = BotContext {
            inbound,
            key,
            state,
            default_bot: self.settings.default_bot.clone(),
            instance: self.settings.instance.clone(),
            states: Arc::clone(&self.states),
            bridge: Arc::clone(&self.bridge),
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
            depth: 0,
        };
        Ok(handler.handle(&mut ctx).await)
    }
}

/// Everything a handler may touch during one turn.
pub struct BotContext {
    inbound: InboundMessage,
    key: StateKey,
    state: Option<ConversationState>,
    default_bot: String,
    instance: String,
    states: Arc<dyn StateStore>,
    bridge: Arc<dyn MessagingBridge>,
    registry: Arc<BotRegistry>,
    events: Option<Arc<dyn EventSink>>,
    depth: u8,
}

impl BotContext {
    pub fn tenant_id(&self) -> &str {
        &self.inbound.tenant_id
    }

    /// Sender handle (phone number).
    pub fn from(&self) -> &str {
        &self.inbound.from
    }

    pub fn text(&self) -> &str {
        &self.inbound.text
    }

    pub fn message(&self) -> &InboundMessage {
        &self.inbound
    }

    /// Current state, or `None` for a conversation never seen before.
    pub fn state(&self) -> Option<&ConversationState> {
        self.state.as_ref()
    }

    /// Sub-state label of the active bot.
    pub fn fsm(&self) -> Option<&str> {
        self.state.as_ref().and_then(|s| s.fsm.as_deref())
    }

    /// Payload of the active bot; empty when there is no state.
    pub fn data(&self) -> Map<String, Value> {
        self.state
            .as_ref()
            .map(|s| s.data.clone())
            .unwrap_or_default()
    }

    /// Merge `patch` onto the current state and persist it.
    pub async fn set_state(
        &mut self,
        patch: StatePatch,
    ) -> Result<&ConversationState, WagateError> {
        let merged = patch.apply(self.state.clone(), &self.default_bot);
        let stored = self.states.set(&self.key, merged).await?;
        Ok(self.state.insert(stored))
    }

    /// Drop the stored state; the next turn starts with the default bot.
    pub async fn clear_state(&mut self) -> Result<(), WagateError> {
        self.states.clear(&self.key).await?;
        self.state = None;
        Ok(())
    }

    /// Send a text through the inbound channel's bridge instance.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<MessageId, WagateError> {
        self.bridge.send_text(&self.instance, to, body).await
    }

    /// Send a text back to the sender.
    pub async fn reply(&self, body: &str) -> Result<MessageId, WagateError> {
        self.send_text(&self.inbound.from, body).await
    }

    /// Best-effort realtime publish for this tenant.
    pub fn publish(&self, event: RealtimeEvent) {
        if let Some(events) = &self.events {
            events.publish(&self.inbound.tenant_id, event);
        }
    }

    /// Hand the current turn to another bot.
    pub async fn delegate(&mut self, bot_key: &str) -> TurnOutcome {
        if self.depth >= MAX_DELEGATION_DEPTH {
            return TurnOutcome::Degraded(WagateError::Internal(format!(
                "delegation depth exceeded at `{bot_key}`"
            )));
        }
        let handler = self.registry.resolve(bot_key);
        self.depth += 1;
        let outcome = handler.handle(self).await;
        self.depth -= 1;
        outcome
    }
}
