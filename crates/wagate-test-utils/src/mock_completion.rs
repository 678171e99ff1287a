// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wagate_core::{
    AdapterType, CompletionProvider, HealthStatus, PluginAdapter, ProviderFailure, WagateError,
};

const DEFAULT_REPLY: &str = "Hola, ¿en qué puedo ayudarte?";

/// A completion provider answering from a queue.
///
/// When the queue is empty every call returns a fixed reply. Prompts are
/// recorded as `(user_text, system_prompt)` pairs.
#[derive(Debug, Default)]
pub struct MockCompletion {
    replies: Mutex<VecDeque<Result<String, ProviderFailure>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    /// Queue a failure of the given kind.
    pub async fn push_failure(&self, kind: ProviderFailure) {
        self.replies.lock().await.push_back(Err(kind));
    }

    pub async fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockCompletion {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, WagateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagateError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn generate(&self, user_text: &str, system_prompt: &str) -> Result<String, WagateError> {
        self.prompts
            .lock()
            .await
            .push((user_text.to_string(), system_prompt.to_string()));
        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(kind)) => Err(WagateError::provider(kind, "mock failure")),
            None => Ok(DEFAULT_REPLY.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let mock = MockCompletion::with_replies(vec!["uno".into()]);
        assert_eq!(mock.generate("a", "sys").await.unwrap(), "uno");
        assert_eq!(mock.generate("b", "sys").await.unwrap(), DEFAULT_REPLY);
        assert_eq!(mock.call_count().await, 2);
    }

    #[tokio::test]
    async fn queued_failure_is_distinguishable() {
        let mock = MockCompletion::new();
        mock.push_failure(ProviderFailure::RateLimited).await;
        let err = mock.generate("a", "sys").await.unwrap_err();
        assert_eq!(err.provider_failure(), Some(ProviderFailure::RateLimited));
    }
}
