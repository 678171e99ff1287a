// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the wagate gateway.

use strum::Display;
use thiserror::Error;

/// Distinguishable failure kinds reported by a text-completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProviderFailure {
    /// The provider rejected the configured credentials (HTTP 401).
    InvalidCredentials,
    /// The provider is throttling requests (HTTP 429).
    RateLimited,
    /// The provider answered without any usable text.
    EmptyResponse,
    /// Any other provider-side failure.
    Other,
}

/// The primary error type used across all wagate adapter traits and core operations.
///
/// Contention on the slot ledger is NOT an error; it is reported through
/// [`crate::types::HoldOutcome`] and [`crate::types::ConfirmOutcome`].
#[derive(Debug, Error)]
pub enum WagateError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging bridge errors (HTTP failure, unexpected payload, closed channel).
    #[error("bridge error: {message}")]
    Bridge {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Text-completion provider errors.
    #[error("provider error ({kind}): {message}")]
    Provider {
        kind: ProviderFailure,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested adapter was not found.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// Adapter health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WagateError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(kind: ProviderFailure, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a bridge error without an underlying source.
    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the provider failure kind, if this is a provider error.
    pub fn provider_failure(&self) -> Option<ProviderFailure> {
        match self {
            Self::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for errors that originate in the storage layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

