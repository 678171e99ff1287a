// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-completion trait used by the AI fallback bot.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::traits::adapter::PluginAdapter;

/// Prompt in, text out.
///
/// Implementations report credential and rate-limit failures as
/// [`WagateError::Provider`] with the matching [`crate::error::ProviderFailure`].
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    async fn generate(&self, user_text: &str, system_prompt: &str) -> Result<String, WagateError>;
}
