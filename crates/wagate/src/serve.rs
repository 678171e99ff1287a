// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wagate serve` command implementation.
//!
//! Builds every collaborator once (storage, ledger, state store, bridge,
//! completion provider, event bus, bot registry, runtime) and hands them
//! to the gateway channel and bot loop explicitly.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use wagate_bots::shutdown;
use wagate_bots::{
    BookingRepository, BotLoop, BotRuntime, Clock, ReservationSettings, RuntimeSettings,
    SystemClock, spawn_hold_reaper, standard_registry,
};
use wagate_bus::EventBus;
use wagate_config::WagateConfig;
use wagate_core::{
    CompletionProvider, MessagingBridge, PluginAdapter, StateStore, StorageAdapter, WagateError,
};
use wagate_gateway::{GatewayChannel, GatewayChannelConfig};
use wagate_openai::OpenAiProvider;
use wagate_storage::{MemoryStateStore, SqliteStorage};
use wagate_whatsapp::EvolutionBridge;

/// Runs the `wagate serve` command until SIGINT/SIGTERM.
pub async fn run_serve(config: WagateConfig) -> Result<(), WagateError> {
    init_tracing(&config.service.log_level);

    info!(name = %config.service.name, "starting wagate serve");

    if !config.gateway.enabled {
        return Err(WagateError::Config(
            "gateway.enabled is false; serve has no way to receive webhooks".into(),
        ));
    }

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let states: Arc<dyn StateStore> = match config.storage.state_backend.as_str() {
        "memory" => {
            warn!("conversation state is kept in memory and lost on restart");
            Arc::new(MemoryStateStore::new())
        }
        _ => storage.clone(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bookings = BookingRepository::new(storage.clone(), clock.clone());

    let evolution = EvolutionBridge::new(&config.bridge)?;
    if evolution.is_dry_run() {
        warn!("bridge dry-run enabled; outbound messages are only logged");
    }
    let bridge: Arc<dyn MessagingBridge> = Arc::new(evolution);

    let completion = init_completion(&config);
    let bus = EventBus::default();

    let registry = standard_registry(
        bookings,
        ReservationSettings::from_config(&config.reservation),
        completion,
    );
    let runtime = BotRuntime::new(
        RuntimeSettings::from_config(&config),
        states,
        Arc::clone(&bridge),
        Arc::new(registry),
    )
    .with_events(Arc::new(bus.clone()));

    let channel = GatewayChannel::new(
        GatewayChannelConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
            bearer_token: config.gateway.bearer_token.clone(),
            default_tenant: config.service.default_tenant.clone(),
            instance: config.bridge.instance_name.clone(),
            inbound_buffer: config.runtime.inbound_buffer,
        },
        Arc::clone(&bridge),
        bus,
    );

    let cancel = shutdown::install_signal_handler();

    let reaper = if config.runtime.reaper_interval_secs > 0 {
        Some(spawn_hold_reaper(
            storage.clone(),
            clock,
            Duration::from_secs(config.runtime.reaper_interval_secs),
            cancel.clone(),
        ))
    } else {
        None
    };

    let mut bot_loop = BotLoop::new(Box::new(channel), Arc::new(runtime));
    let result = bot_loop.run(cancel.clone()).await;

    cancel.cancel();
    if let Some(reaper) = reaper {
        let _ = reaper.await;
    }
    if let Err(e) = bridge.shutdown().await {
        warn!(error = %e, "bridge shutdown failed");
    }
    storage.close().await?;

    info!("wagate serve stopped");
    result
}

/// The assistant works without a provider; it degrades every turn instead.
fn init_completion(config: &WagateConfig) -> Option<Arc<dyn CompletionProvider>> {
    if config.openai.api_key.is_none() {
        warn!("openai.api_key not set; the AI assistant will apologise instead of answering");
        return None;
    }
    match OpenAiProvider::new(&config.openai) {
        Ok(provider) => {
            info!(model = provider.model(), "completion provider ready");
            Some(Arc::new(provider))
        }
        Err(e) => {
            warn!(error = %e, "completion provider unavailable");
            None
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wagate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
