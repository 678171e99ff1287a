// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Main menu bot. Keeps no sub-state of its own.

use async_trait::async_trait;
use serde_json::Map;

use wagate_core::StatePatch;

use crate::assistant::{ASSISTANT_BOT, GREETING};
use crate::handler::{BotHandler, TurnOutcome, degrade};
use crate::reservation::{RESERVATION_BOT, WELCOME};
use crate::runtime::BotContext;

pub const MENU_BOT: &str = "menu-basic";

pub const MENU_TEXT: &str = "👋 *Bienvenido*\n\
1) Reservar una cita\n\
2) Consultar/confirmar pago\n\
3) Hablar con un agente\n\
4) Hablar con el asistente virtual\n\
\n\
Responde con el número de la opción.";

pub const PAYMENTS_TEXT: &str = "💳 *Pagos en construcción*\n\n\
Esta funcionalidad estará disponible pronto. Responde *MENÚ* para volver al inicio.";

pub const AGENT_TEXT: &str = "👤 *Conectándote con un agente...*\n\n\
En breve te contactaremos. Responde *MENÚ* para volver al inicio.";

const APOLOGY: &str = "❌ Error interno. Responde *MENÚ* para volver al inicio.";

#[derive(Debug, Default, Clone, Copy)]
pub struct MenuBot;

impl MenuBot {
    async fn send(&self, ctx: &BotContext, body: &str) -> TurnOutcome {
        match ctx.reply(body).await {
            Ok(_) => TurnOutcome::Handled,
            Err(e) => TurnOutcome::Degraded(e),
        }
    }
}

#[async_trait]
impl BotHandler for MenuBot {
    fn key(&self) -> &'static str {
        MENU_BOT
    }

    async fn handle(&self, ctx: &mut BotContext) -> TurnOutcome {
        match ctx.text().trim() {
            "1" => {
                let patch = StatePatch::bot(RESERVATION_BOT)
                    .with_fsm(WELCOME)
                    .with_data(Map::new());
                if let Err(e) = ctx.set_state(patch).await {
                    return degrade(ctx, MENU_BOT, e, APOLOGY).await;
                }
                ctx.delegate(RESERVATION_BOT).await
            }
            "2" => self.send(ctx, PAYMENTS_TEXT).await,
            "3" => self.send(ctx, AGENT_TEXT).await,
            "4" => {
                if let Err(e) = ctx.set_state(StatePatch::bot(ASSISTANT_BOT)).await {
                    return degrade(ctx, MENU_BOT, e, APOLOGY).await;
                }
                self.send(ctx, GREETING).await
            }
            _ => self.send(ctx, MENU_TEXT).await,
        }
    }
}
