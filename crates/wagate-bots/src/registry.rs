// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup table from bot key to handler.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::handler::BotHandler;

/// Bot handlers by key, with a fallback for unknown keys.
///
/// The fallback is supplied at construction, so [`BotRegistry::resolve`]
/// always yields a handler.
pub struct BotRegistry {
    handlers: HashMap<&'static str, Arc<dyn BotHandler>>,
    fallback: Arc<dyn BotHandler>,
}

impl BotRegistry {
    /// Create a registry whose fallback (and first entry) is `fallback`.
    pub fn new(fallback: Arc<dyn BotHandler>) -> Self {
        let mut handlers: HashMap<&'static str, Arc<dyn BotHandler>> = HashMap::new();
        handlers.insert(fallback.key(), Arc::clone(&fallback));
        Self { handlers, fallback }
    }

    /// Add (or replace) a handler under its own key.
    pub fn register(&mut self, handler: Arc<dyn BotHandler>) -> &mut Self {
        self.handlers.insert(handler.key(), handler);
        self
    }

    /// Handler for `key`, or the fallback when the key is unknown.
    pub fn resolve(&self, key: &str) -> Arc<dyn BotHandler> {
        match self.handlers.get(key) {
            Some(handler) => Arc::clone(handler),
            None => {
                debug!(bot_key = key, fallback = self.fallback.key(), "unknown bot key");
                Arc::clone(&self.fallback)
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn fallback_key(&self) -> &'static str {
        self.fallback.key()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.handlers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}
