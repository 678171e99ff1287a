// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage lifecycle trait.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::traits::adapter::PluginAdapter;

/// Lifecycle of a persistent storage backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), WagateError>;

    /// Flushes and closes the backend.
    async fn close(&self) -> Result<(), WagateError>;
}
