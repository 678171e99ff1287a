// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reservation bot.
//!
//! ```text
//! WELCOME ──(offer A/B, hold both)──▶ SLOT_HELD ──(choice, confirm)──▶ CONFIRMED
//!    ▲                                   │
//!    └──────────(hold lost or expired)───┘
//! ```
//!
//! The offered options live in the conversation payload under `slots`, so a
//! later turn re-derives the slot from what the user was shown.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use wagate_config::model::ReservationConfig;
use wagate_core::{
    ConfirmOutcome, FinalizeRequest, HoldRequest, RealtimeEvent, StatePatch, WagateError,
};

use crate::booking::BookingRepository;
use crate::handler::{BotHandler, TurnOutcome, degrade};
use crate::runtime::BotContext;

pub const RESERVATION_BOT: &str = "reservas-basic";

pub const WELCOME: &str = "WELCOME";
pub const SLOT_HELD: &str = "SLOT_HELD";
pub const CONFIRMED: &str = "CONFIRMED";

const APOLOGY: &str = "❌ Error interno. Responde *MENÚ* para volver al inicio.";
const EXPIRED: &str = "⏳ Expiró el hold, intenta otra vez.";

/// Where and when the two quick options are offered.
#[derive(Debug, Clone)]
pub struct ReservationSettings {
    pub resource_id: String,
    pub hold: Duration,
    pub slot_minutes: u32,
    pub today_hour: u32,
    pub tomorrow_hour: u32,
    /// Offset used to decide what "today" and "tomorrow" mean.
    pub offset: FixedOffset,
}

impl ReservationSettings {
    pub fn from_config(config: &ReservationConfig) -> Self {
        Self {
            resource_id: config.resource_id.clone(),
            hold: Duration::from_millis(config.hold_ms),
            slot_minutes: config.slot_minutes,
            today_hour: config.today_hour,
            tomorrow_hour: config.tomorrow_hour,
            offset: FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or(Utc.fix()),
        }
    }
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self::from_config(&ReservationConfig::default())
    }
}

/// One offered option, as stored in the conversation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOption {
    pub available: bool,
    pub slot_id: String,
    #[serde(rename = "startISO")]
    pub start_iso: String,
    #[serde(rename = "endISO")]
    pub end_iso: String,
    pub display: String,
}

impl SlotOption {
    fn start_end(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), WagateError> {
        let parse = |raw: &str| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| WagateError::Internal(format!("stored slot time `{raw}`: {e}")))
        };
        Ok((parse(&self.start_iso)?, parse(&self.end_iso)?))
    }

    fn line(&self, letter: &str) -> String {
        if self.available {
            format!("{letter}) {}", self.display)
        } else {
            format!("{letter}) {} (no disponible)", self.display)
        }
    }
}

/// A candidate slot before it has been held.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub letter: &'static str,
    pub display: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub struct ReservationBot {
    repo: BookingRepository,
    settings: ReservationSettings,
}

impl ReservationBot {
    pub fn new(repo: BookingRepository, settings: ReservationSettings) -> Self {
        Self { repo, settings }
    }

    /// The "today" and "tomorrow" options relative to `now`.
    pub fn candidates(&self, now: DateTime<Utc>) -> Result<[Candidate; 2], WagateError> {
        let offset = self.settings.offset;
        let today = now.with_timezone(&offset).date_naive();
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| WagateError::Internal("calendar overflow".into()))?;
        let length = chrono::Duration::minutes(i64::from(self.settings.slot_minutes));

        let at = |date: chrono::NaiveDate, hour: u32| -> Result<DateTime<Utc>, WagateError> {
            let time = NaiveTime::from_hms_opt(hour, 0, 0)
                .ok_or_else(|| WagateError::Internal(format!("invalid slot hour {hour}")))?;
            offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .map(|t| t.with_timezone(&Utc))
                .ok_or_else(|| WagateError::Internal(format!("ambiguous local time {date} {time}")))
        };
        let label = |prefix: &str, start: DateTime<Utc>| {
            format!("{prefix} {}", start.with_timezone(&offset).format("%H:%M"))
        };

        let a = at(today, self.settings.today_hour)?;
        let b = at(tomorrow, self.settings.tomorrow_hour)?;
        Ok([
            Candidate {
                letter: "A",
                display: label("Hoy", a),
                start: a,
                end: a + length,
            },
            Candidate {
                letter: "B",
                display: label("Mañana", b),
                start: b,
                end: b + length,
            },
        ])
    }

    fn hold_request(&self, ctx: &BotContext, start: DateTime<Utc>, end: DateTime<Utc>) -> HoldRequest {
        HoldRequest {
            tenant_id: ctx.tenant_id().to_string(),
            resource_id: self.settings.resource_id.clone(),
            start_at: start,
            end_at: end,
            hold_for: self.settings.hold,
            requester: Some(ctx.from().to_string()),
        }
    }

    /// WELCOME: hold both candidates at once and offer them.
    async fn offer(&self, ctx: &mut BotContext) -> Result<(), WagateError> {
        let [a, b] = self.candidates(self.repo.now())?;
        let (hold_a, hold_b) = (
            self.hold_request(ctx, a.start, a.end),
            self.hold_request(ctx, b.start, b.end),
        );
        let (held_a, held_b) = tokio::join!(self.repo.hold(&hold_a), self.repo.hold(&hold_b));

        let mut slots = BTreeMap::new();
        for (candidate, outcome) in [(a, held_a), (b, held_b)] {
            if !outcome.is_granted() {
                info!(slot_key = %outcome.slot_key(), from = ctx.from(), "offered slot unavailable");
            }
            slots.insert(
                candidate.letter.to_string(),
                SlotOption {
                    available: outcome.is_granted(),
                    slot_id: outcome.slot_key().to_string(),
                    start_iso: wagate_core::types::iso_millis(&candidate.start),
                    end_iso: wagate_core::types::iso_millis(&candidate.end),
                    display: candidate.display,
                },
            );
        }

        let lines: Vec<String> = slots.iter().map(|(letter, opt)| opt.line(letter)).collect();
        let body = format!(
            "🗓️ *Reservas*\nOpciones rápidas:\n{}\nResponde *A* o *B* para tomar el horario.",
            lines.join("\n")
        );

        let mut data = Map::new();
        data.insert("slots".into(), serde_json::to_value(&slots).map_err(internal)?);
        ctx.set_state(StatePatch::fsm(SLOT_HELD).with_data(data))
            .await?;
        ctx.reply(&body).await?;
        Ok(())
    }

    /// SLOT_HELD: interpret the user's choice and try to book it.
    async fn choose(&self, ctx: &mut BotContext) -> Result<(), WagateError> {
        let mut data = ctx.data();
        let slots: BTreeMap<String, SlotOption> = data
            .get("slots")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let choice = ctx.text().trim().to_uppercase();
        if choice != "A" && choice != "B" {
            let shown = |letter: &str| {
                slots
                    .get(letter)
                    .map(|o| o.display.clone())
                    .unwrap_or_else(|| "-".into())
            };
            let body = format!(
                "❓ Opción inválida. Responde *A* ({}) o *B* ({}).",
                shown("A"),
                shown("B")
            );
            ctx.reply(&body).await?;
            return Ok(());
        }

        let Some(option) = slots.get(&choice) else {
            warn!(from = ctx.from(), choice = %choice, "held payload has no such option");
            ctx.reply(APOLOGY).await?;
            return Ok(());
        };
        if !option.available {
            ctx.reply(&format!("❌ {} no está disponible. Elige otra opción.", option.display))
                .await?;
            return Ok(());
        }

        let (start, end) = option.start_end()?;
        let slot_key = BookingRepository::slot_key(ctx.tenant_id(), &self.settings.resource_id, &start);
        let now = self.repo.now();
        let still_ours = match self.repo.get_slot(&slot_key).await {
            Ok(slot) => slot.is_some_and(|slot| slot.is_live_hold_for(ctx.from(), &now)),
            Err(e) => {
                error!(
                    %slot_key,
                    from = ctx.from(),
                    error = %e,
                    "slot read failed, treating hold as lapsed"
                );
                false
            }
        };

        if !still_ours {
            info!(%slot_key, from = ctx.from(), "hold lapsed, trying to re-hold");
            let request = self.hold_request(ctx, start, end);
            if !self.repo.hold(&request).await.is_granted() {
                return self.restart(ctx).await;
            }
        }

        let request = FinalizeRequest {
            tenant_id: ctx.tenant_id().to_string(),
            resource_id: self.settings.resource_id.clone(),
            start_at: start,
            wa_number: ctx.from().to_string(),
        };
        let booking = match self.repo.confirm(&request).await {
            ConfirmOutcome::Confirmed(booking) => booking,
            ConfirmOutcome::Denied { reason, .. } => {
                warn!(%slot_key, from = ctx.from(), %reason, "confirm lost");
                return self.restart(ctx).await;
            }
        };

        let display = option.display.clone();
        data.insert("bookingId".into(), Value::String(booking.booking_id.clone()));
        data.insert("confirmedSlot".into(), Value::String(display.clone()));
        ctx.set_state(StatePatch::fsm(CONFIRMED).with_data(data))
            .await?;
        ctx.reply(&format!(
            "✅ *Reserva confirmada* para {display}. Te enviaremos un recordatorio.\n\nID: {}",
            booking.booking_id
        ))
        .await?;
        ctx.publish(RealtimeEvent::BookingConfirmed {
            booking_id: booking.booking_id.clone(),
            slot_key: booking.slot_key.clone(),
            wa_number: booking.wa_number.clone(),
            start_at: wagate_core::types::iso_millis(&booking.start_at),
        });
        Ok(())
    }

    /// Tell the user the hold is gone and start over on the next turn.
    async fn restart(&self, ctx: &mut BotContext) -> Result<(), WagateError> {
        ctx.reply(EXPIRED).await?;
        ctx.set_state(StatePatch::fsm(WELCOME).with_data(Map::new()))
            .await?;
        Ok(())
    }

    async fn repeat_confirmation(&self, ctx: &BotContext) -> Result<(), WagateError> {
        let data = ctx.data();
        let slot = data
            .get("confirmedSlot")
            .and_then(Value::as_str)
            .unwrap_or("tu horario");
        ctx.reply(&format!(
            "✅ Tu reserva para {slot} ya está confirmada. Responde *MENÚ* para volver al inicio."
        ))
        .await?;
        Ok(())
    }
}

fn internal(e: serde_json::Error) -> WagateError {
    WagateError::Internal(format!("slot payload: {e}"))
}

#[async_trait]
impl BotHandler for ReservationBot {
    fn key(&self) -> &'static str {
        RESERVATION_BOT
    }

    async fn handle(&self, ctx: &mut BotContext) -> TurnOutcome {
        let step = match ctx.fsm() {
            Some(SLOT_HELD) => self.choose(ctx).await,
            Some(CONFIRMED) => self.repeat_confirmation(ctx).await,
            _ => self.offer(ctx).await,
        };
        match step {
            Ok(()) => TurnOutcome::Handled,
            Err(e) => degrade(ctx, RESERVATION_BOT, e, APOLOGY).await,
        }
    }
}
