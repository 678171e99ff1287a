// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bot handler trait.

use async_trait::async_trait;
use tracing::warn;

use wagate_core::WagateError;

use crate::runtime::BotContext;

/// How a turn ended.
///
/// Handlers never let errors escape: a failed downstream call is reported
/// as `Degraded` after the user has been sent an apology.
#[derive(Debug)]
pub enum TurnOutcome {
    Handled,
    Degraded(WagateError),
}

impl TurnOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn error(&self) -> Option<&WagateError> {
        match self {
            Self::Handled => None,
            Self::Degraded(e) => Some(e),
        }
    }
}

/// One conversation state machine, selected by its key.
#[async_trait]
pub trait BotHandler: Send + Sync + 'static {
    /// Registry key, also stored as the conversation's active bot.
    fn key(&self) -> &'static str;

    /// Process the inbound text held by `ctx`.
    async fn handle(&self, ctx: &mut BotContext) -> TurnOutcome;
}

/// Convert a failed step into a degraded turn, telling the user first.
pub(crate) async fn degrade(
    ctx: &BotContext,
    bot: &'static str,
    error: WagateError,
    apology: &str,
) -> TurnOutcome {
    warn!(
        bot,
        tenant_id = ctx.tenant_id(),
        from = ctx.from(),
        error = %error,
        "turn degraded"
    );
    if let Err(send_err) = ctx.reply(apology).await {
        warn!(bot, error = %send_err, "apology could not be delivered");
    }
    TurnOutcome::Degraded(error)
}
