// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation runtime for the wagate gateway.
//!
//! Inbound messages are pulled from a [`ChannelAdapter`] by [`BotLoop`] and
//! each one is processed as its own task by the [`BotRuntime`], which loads
//! the sender's conversation state and dispatches to the active
//! [`BotHandler`]. The reservation bot reaches the slot ledger only through
//! the [`BookingRepository`].

pub mod assistant;
pub mod booking;
pub mod clock;
pub mod handler;
pub mod menu;
pub mod registry;
pub mod reservation;
pub mod runtime;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wagate_core::{ChannelAdapter, CompletionProvider, InboundMessage, WagateError};

pub use assistant::AssistantBot;
pub use booking::{BookingRepository, spawn_hold_reaper};
pub use clock::{Clock, ManualClock, SystemClock};
pub use handler::{BotHandler, TurnOutcome};
pub use menu::MenuBot;
pub use registry::BotRegistry;
pub use reservation::{ReservationBot, ReservationSettings};
pub use runtime::{BotContext, BotRuntime, RuntimeSettings};

/// How long in-flight turns may run after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// The menu, reservation and assistant bots, with the menu as fallback.
pub fn standard_registry(
    bookings: BookingRepository,
    reservation: ReservationSettings,
    completion: Option<Arc<dyn CompletionProvider>>,
) -> BotRegistry {
    let mut registry = BotRegistry::new(Arc::new(MenuBot));
    registry
        .register(Arc::new(ReservationBot::new(bookings, reservation)))
        .register(Arc::new(AssistantBot::new(completion)));
    registry
}

/// Pulls inbound messages off a channel and runs one task per turn.
pub struct BotLoop {
    channel: Box<dyn ChannelAdapter>,
    runtime: Arc<BotRuntime>,
    drain_timeout: Duration,
}

impl BotLoop {
    pub fn new(channel: Box<dyn ChannelAdapter>, runtime: Arc<BotRuntime>) -> Self {
        Self {
            channel,
            runtime,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Run until `cancel` fires or the channel closes, then drain.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), WagateError> {
        self.channel.connect().await?;
        info!(channel = self.channel.name(), "bot loop running");

        let mut turns = JoinSet::new();
        loop {
            tokio::select! {
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => {
                            turns.spawn(process_turn(Arc::clone(&self.runtime), inbound));
                        }
                        Err(e) => {
                            error!(error = %e, "channel receive error");
                            if e.to_string().contains("closed") {
                                break;
                            }
                        }
                    }
                }
                Some(joined) = turns.join_next(), if !turns.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "turn task panicked");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping bot loop");
                    break;
                }
            }
        }

        shutdown::drain_turns(&mut turns, self.drain_timeout).await;
        if let Err(e) = self.channel.shutdown().await {
            warn!(error = %e, "channel shutdown failed");
        }
        info!("bot loop stopped");
        Ok(())
    }
}

async fn process_turn(runtime: Arc<BotRuntime>, inbound: InboundMessage) {
    let tenant_id = inbound.tenant_id.clone();
    let from = inbound.from.clone();
    match runtime.process(inbound).await {
        Ok(TurnOutcome::Handled) => debug!(%tenant_id, %from, "turn handled"),
        Ok(TurnOutcome::Degraded(e)) => debug!(%tenant_id, %from, error = %e, "turn degraded"),
        Err(e) => error!(%tenant_id, %from, error = %e, "turn failed before dispatch"),
    }
}
