// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express. All problems are collected
//! before returning.

use crate::diagnostic::ConfigError;
use crate::model::WagateConfig;

const STATE_BACKENDS: &[&str] = &["sqlite", "memory"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_HOLD_MS: u64 = 24 * 60 * 60 * 1000;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &WagateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.service.log_level
        )));
    }

    if config.service.default_tenant.trim().is_empty() {
        errors.push(ConfigError::validation("service.default_tenant must not be empty"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation("storage.database_path must not be empty"));
    }

    if !STATE_BACKENDS.contains(&config.storage.state_backend.as_str()) {
        errors.push(ConfigError::validation(format!(
            "storage.state_backend must be one of {}, got `{}`",
            STATE_BACKENDS.join(", "),
            config.storage.state_backend
        )));
    }

    if !config.bridge.dry_run {
        let url = config.bridge.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "bridge.base_url must be an http(s) URL, got `{url}`"
            )));
        }
    }

    if config.bridge.instance_name.trim().is_empty() {
        errors.push(ConfigError::validation("bridge.instance_name must not be empty"));
    }

    let reservation = &config.reservation;
    if reservation.hold_ms == 0 {
        errors.push(ConfigError::validation("reservation.hold_ms must be greater than 0"));
    } else if reservation.hold_ms > MAX_HOLD_MS {
        errors.push(ConfigError::validation(format!(
            "reservation.hold_ms must be at most {MAX_HOLD_MS} (24h), got {}",
            reservation.hold_ms
        )));
    }
    if reservation.slot_minutes == 0 {
        errors.push(ConfigError::validation(
            "reservation.slot_minutes must be greater than 0",
        ));
    }
    for (key, hour) in [
        ("today_hour", reservation.today_hour),
        ("tomorrow_hour", reservation.tomorrow_hour),
    ] {
        if hour > 23 {
            errors.push(ConfigError::validation(format!(
                "reservation.{key} must be between 0 and 23, got {hour}"
            )));
        }
    }
    if reservation.utc_offset_minutes.abs() > 14 * 60 {
        errors.push(ConfigError::validation(format!(
            "reservation.utc_offset_minutes must be within +/-840, got {}",
            reservation.utc_offset_minutes
        )));
    }

    if config.runtime.menu_keywords.iter().all(|k| k.trim().is_empty()) {
        errors.push(ConfigError::validation(
            "runtime.menu_keywords must contain at least one keyword",
        ));
    }
    if config.runtime.inbound_buffer == 0 {
        errors.push(ConfigError::validation(
            "runtime.inbound_buffer must be greater than 0",
        ));
    }

    if config.gateway.enabled && config.gateway.bearer_token.is_none() {
        errors.push(ConfigError::validation(
            "gateway.bearer_token is required when the gateway is enabled",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
