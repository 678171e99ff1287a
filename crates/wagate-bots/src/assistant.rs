// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI assistant bot backed by a [`CompletionProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use wagate_core::{CompletionProvider, WagateError};

use crate::handler::{BotHandler, TurnOutcome, degrade};
use crate::runtime::BotContext;

pub const ASSISTANT_BOT: &str = "simple-ai";

pub const GREETING: &str = "👋 ¡Hola! Soy tu asistente de IA. ¿En qué puedo ayudarte?";

const APOLOGY: &str = "🔧 Lo siento, hay un problema técnico. Por favor intenta de nuevo o \
escribe *MENÚ* para ver las opciones disponibles.";

/// System prompt for `tenant_id`.
pub fn system_prompt(tenant_id: &str) -> String {
    format!(
        "Eres un asistente virtual amigable para un negocio de WhatsApp.\n\
\n\
INSTRUCCIONES:\n\
- Responde de manera concisa y útil\n\
- Usa emojis apropiadamente\n\
- Si te preguntan sobre reservas, indica que escriban \"menú\" y elijan la opción 1\n\
- Si te preguntan sobre el menú, menciona que pueden usar \"menú\"\n\
- Mantén un tono profesional pero amigable\n\
- Responde en español\n\
- Máximo 2-3 líneas por respuesta\n\
\n\
CONTEXTO DEL NEGOCIO:\n\
- Empresa: {tenant_id}\n\
- Ofrecemos servicios de reservas\n\
- Tenemos bots especializados para diferentes funciones"
    )
}

/// Relays every non-empty message to the completion provider.
///
/// Without a provider every turn degrades to the apology.
pub struct AssistantBot {
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl AssistantBot {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { provider }
    }

    async fn answer(&self, ctx: &BotContext, text: &str) -> Result<(), WagateError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| WagateError::Config("no completion provider configured".into()))?;
        debug!(tenant_id = ctx.tenant_id(), from = ctx.from(), "generating reply");
        let reply = provider
            .generate(text, &system_prompt(ctx.tenant_id()))
            .await?;
        ctx.reply(&reply).await?;
        Ok(())
    }
}

#[async_trait]
impl BotHandler for AssistantBot {
    fn key(&self) -> &'static str {
        ASSISTANT_BOT
    }

    async fn handle(&self, ctx: &mut BotContext) -> TurnOutcome {
        let text = ctx.text().trim().to_string();
        let step = if text.is_empty() {
            ctx.reply(GREETING).await.map(|_| ())
        } else {
            self.answer(ctx, &text).await
        };
        match step {
            Ok(()) => TurnOutcome::Handled,
            Err(e) => degrade(ctx, ASSISTANT_BOT, e, APOLOGY).await,
        }
    }
}
