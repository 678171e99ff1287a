// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the wagate gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level wagate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WagateConfig {
    /// Service identity and conversation defaults.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Upstream WhatsApp bridge (Evolution API) settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// OpenAI text-completion settings for the AI fallback bot.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Reservation bot slot layout.
    #[serde(default)]
    pub reservation: ReservationConfig,

    /// Bot runtime behaviour.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Service identity and defaults applied to inbound messages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name, used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Tenant assigned to inbound messages that do not name one.
    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    /// Bot that owns a conversation with no stored state.
    #[serde(default = "default_bot")]
    pub default_bot: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            default_tenant: default_tenant(),
            default_bot: default_bot(),
        }
    }
}

fn default_service_name() -> String {
    "wagate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tenant() -> String {
    "mvp".to_string()
}

fn default_bot() -> String {
    "menu-basic".to_string()
}

/// Evolution API bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the bridge, e.g. `http://localhost:8080`.
    #[serde(default = "default_bridge_url")]
    pub base_url: String,

    /// API key sent in the `apikey` header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Instance used for outbound replies.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Log outbound messages instead of sending them.
    #[serde(default)]
    pub dry_run: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            api_key: None,
            instance_name: default_instance_name(),
            dry_run: false,
            timeout_secs: default_bridge_timeout(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_instance_name() -> String {
    "wa-mvp".to_string()
}

fn default_bridge_timeout() -> u64 {
    30
}

/// OpenAI chat-completions configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` disables the AI fallback bot's completions.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (without `/chat/completions`).
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            model: default_openai_model(),
            max_tokens: default_openai_max_tokens(),
            temperature: default_openai_temperature(),
        }
    }
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_max_tokens() -> u32 {
    500
}

fn default_openai_temperature() -> f32 {
    0.7
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for concurrent reads.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Where conversation state lives: `sqlite` or `memory`.
    #[serde(default = "default_state_backend")]
    pub state_backend: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            state_backend: default_state_backend(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("wagate").join("wagate.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("wagate.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_state_backend() -> String {
    "sqlite".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token guarding the `/v1` API.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Externally reachable URL, used to register the bridge webhook.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            public_url: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Slot layout offered by the reservation bot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReservationConfig {
    #[serde(default = "default_resource_id")]
    pub resource_id: String,

    /// How long a hold lasts before it is reclaimable, in milliseconds.
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,

    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,

    /// Local hour of the "today" option.
    #[serde(default = "default_today_hour")]
    pub today_hour: u32,

    /// Local hour of the "tomorrow" option.
    #[serde(default = "default_tomorrow_hour")]
    pub tomorrow_hour: u32,

    /// Offset of the business's local time from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            resource_id: default_resource_id(),
            hold_ms: default_hold_ms(),
            slot_minutes: default_slot_minutes(),
            today_hour: default_today_hour(),
            tomorrow_hour: default_tomorrow_hour(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_resource_id() -> String {
    "default".to_string()
}

fn default_hold_ms() -> u64 {
    180_000
}

fn default_slot_minutes() -> u32 {
    60
}

fn default_today_hour() -> u32 {
    16
}

fn default_tomorrow_hour() -> u32 {
    10
}

/// Bot runtime behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Words that send any conversation back to the menu (case-insensitive).
    #[serde(default = "default_menu_keywords")]
    pub menu_keywords: Vec<String>,

    /// Process one message at a time per (tenant, user).
    #[serde(default = "default_serialize_per_user")]
    pub serialize_per_user: bool,

    /// Capacity of the inbound message queue.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,

    /// Interval between expired-hold purges, in seconds. 0 disables the reaper.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            menu_keywords: default_menu_keywords(),
            serialize_per_user: default_serialize_per_user(),
            inbound_buffer: default_inbound_buffer(),
            reaper_interval_secs: default_reaper_interval(),
        }
    }
}

fn default_menu_keywords() -> Vec<String> {
    vec!["menú".to_string(), "menu".to_string()]
}

fn default_serialize_per_user() -> bool {
    true
}

fn default_inbound_buffer() -> usize {
    256
}

fn default_reaper_interval() -> u64 {
    60
}
