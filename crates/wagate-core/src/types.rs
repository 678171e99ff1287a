// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the slot ledger, the conversation runtime and the
//! adapter traits.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Render a timestamp the way slot keys and payloads carry it:
/// ISO-8601, UTC, millisecond precision (`2026-10-19T16:00:00.000Z`).
pub fn iso_millis(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Unique identifier for a message accepted by the messaging bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Deterministic slot identity: `{tenant}#{resource}#{startISO}`.
///
/// Two hold attempts for the same tenant, resource and start instant always
/// address the same ledger row, so no lookup is needed before acquiring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotKey(pub String);

impl SlotKey {
    /// Derive the key for a slot. This is the only place key layout is defined.
    pub fn derive(tenant_id: &str, resource_id: &str, start_at: &DateTime<Utc>) -> Self {
        Self(format!("{tenant_id}#{resource_id}#{}", iso_millis(start_at)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation state key: `{tenant}:{user}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(pub String);

impl StateKey {
    pub fn new(tenant_id: &str, user: &str) -> Self {
        Self(format!("{tenant_id}:{user}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Bridge,
    Completion,
    Storage,
}

// --- Slot ledger ---

/// Lifecycle status of a slot row.
///
/// Transitions: free -> held, held -> booked, held -> free. Booked is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Free,
    Held,
    Booked,
}

/// A schedulable interval for one resource of one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_key: SlotKey,
    pub tenant_id: String,
    pub resource_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SlotStatus,
    /// Present only while held.
    pub hold_until: Option<DateTime<Utc>>,
    /// Requester that owns the current hold, if recorded.
    pub held_by: Option<String>,
    /// Epoch seconds after which an abandoned hold row may be purged.
    pub gc_at: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    /// Mirrors the acquisition predicate of the ledger: free, or held with an
    /// expiry strictly before `now`.
    pub fn is_acquirable(&self, now: &DateTime<Utc>) -> bool {
        match self.status {
            SlotStatus::Free => true,
            SlotStatus::Held => self.hold_until.is_none_or(|until| until < *now),
            SlotStatus::Booked => false,
        }
    }

    /// True when the slot carries an unexpired hold that `requester` may finalize.
    pub fn is_live_hold_for(&self, requester: &str, now: &DateTime<Utc>) -> bool {
        self.status == SlotStatus::Held
            && self.hold_until.is_some_and(|until| until >= *now)
            && self.held_by.as_deref().is_none_or(|owner| owner == requester)
    }
}

/// Input for acquire-or-refresh-hold.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub tenant_id: String,
    pub resource_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub hold_for: Duration,
    /// Who is holding. Recorded so finalize can refuse other requesters.
    pub requester: Option<String>,
}

impl HoldRequest {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::derive(&self.tenant_id, &self.resource_id, &self.start_at)
    }
}

/// Input for finalize-booking.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub tenant_id: String,
    pub resource_id: String,
    pub start_at: DateTime<Utc>,
    /// Requester phone/handle; becomes the booking owner.
    pub wa_number: String,
}

impl FinalizeRequest {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::derive(&self.tenant_id, &self.resource_id, &self.start_at)
    }
}

/// Why a hold or confirm was not granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// Another requester holds the slot (or it is booked).
    Contended,
    /// The hold expired, was never taken, or belongs to someone else.
    NotHeld,
    /// The storage layer failed; the message is the logged error.
    StorageFault(String),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contended => f.write_str("slot not available"),
            Self::NotHeld => f.write_str("hold expired or slot not held"),
            Self::StorageFault(msg) => write!(f, "database error: {msg}"),
        }
    }
}

/// Result of acquire-or-refresh-hold.
#[derive(Debug, Clone, PartialEq)]
pub enum HoldOutcome {
    Granted {
        slot_key: SlotKey,
        hold_until: DateTime<Utc>,
    },
    Denied {
        slot_key: SlotKey,
        reason: DenialReason,
    },
}

impl HoldOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn slot_key(&self) -> &SlotKey {
        match self {
            Self::Granted { slot_key, .. } | Self::Denied { slot_key, .. } => slot_key,
        }
    }
}

/// Result of finalize-booking.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(Box<Booking>),
    Denied {
        slot_key: SlotKey,
        reason: DenialReason,
    },
}

impl ConfirmOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn booking(&self) -> Option<&Booking> {
        match self {
            Self::Confirmed(b) => Some(b),
            Self::Denied { .. } => None,
        }
    }
}

// --- Bookings ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Canceled,
}

/// One status-changing action in a booking's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub at: DateTime<Utc>,
    pub by: String,
}

/// A confirmed reservation, created together with the slot's move to booked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: String,
    pub tenant_id: String,
    pub wa_number: String,
    pub resource_id: String,
    pub slot_key: SlotKey,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub audit: Vec<AuditEntry>,
}

impl Booking {
    /// Build a freshly confirmed booking for a slot, with a random `bk_` id
    /// and a single `created` audit entry.
    pub fn confirmed(slot: &Slot, wa_number: &str, now: DateTime<Utc>) -> Self {
        Self {
            booking_id: format!("bk_{}", uuid::Uuid::new_v4().simple()),
            tenant_id: slot.tenant_id.clone(),
            wa_number: wa_number.to_string(),
            resource_id: slot.resource_id.clone(),
            slot_key: slot.slot_key.clone(),
            start_at: slot.start_at,
            end_at: slot.end_at,
            status: BookingStatus::Confirmed,
            created_at: now,
            audit: vec![AuditEntry {
                action: "created".to_string(),
                at: now,
                by: wa_number.to_string(),
            }],
        }
    }
}

// --- Conversation state ---

/// Per-(tenant, user) FSM record.
///
/// `fsm` and `data` only mean something to the bot named by `bot_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub bot_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsm: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Epoch milliseconds of the last write, stamped by the store.
    #[serde(default)]
    pub updated_at: i64,
}

impl ConversationState {
    pub fn new(bot_key: impl Into<String>) -> Self {
        Self {
            bot_key: bot_key.into(),
            fsm: None,
            data: Map::new(),
            updated_at: 0,
        }
    }
}

/// A partial update applied by `setState`.
///
/// Absent fields keep their current value. Switching to a different bot
/// drops the previous bot's sub-state and payload unless the patch provides
/// replacements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub bot_key: Option<String>,
    /// `Some(None)` clears the sub-state label.
    pub fsm: Option<Option<String>>,
    pub data: Option<Map<String, Value>>,
}

impl StatePatch {
    pub fn bot(bot_key: impl Into<String>) -> Self {
        Self {
            bot_key: Some(bot_key.into()),
            ..Self::default()
        }
    }

    pub fn fsm(label: impl Into<String>) -> Self {
        Self {
            fsm: Some(Some(label.into())),
            ..Self::default()
        }
    }

    pub fn with_fsm(mut self, label: impl Into<String>) -> Self {
        self.fsm = Some(Some(label.into()));
        self
    }

    pub fn without_fsm(mut self) -> Self {
        self.fsm = Some(None);
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Merge this patch onto `current`, falling back to `default_bot` when
    /// neither side names a bot.
    pub fn apply(self, current: Option<ConversationState>, default_bot: &str) -> ConversationState {
        let current = current.unwrap_or_else(|| ConversationState::new(default_bot));
        let bot_key = self.bot_key.unwrap_or_else(|| current.bot_key.clone());
        let switching = bot_key != current.bot_key;

        let fsm = match self.fsm {
            Some(fsm) => fsm,
            None if switching => None,
            None => current.fsm,
        };
        let data = match self.data {
            Some(data) => data,
            None if switching => Map::new(),
            None => current.data,
        };

        ConversationState {
            bot_key,
            fsm,
            data,
            updated_at: current.updated_at,
        }
    }
}

// --- Messaging ---

/// A text message from an end user, as handed to the bot runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Bridge message id (or a generated one).
    pub id: String,
    pub tenant_id: String,
    /// Sender phone number / handle, without any JID suffix.
    pub from: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Connection state of a bridge instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Connecting,
    Disconnected,
}

/// A provisioned bridge instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub instance_name: String,
    pub instance_id: Option<String>,
    pub status: ConnectionStatus,
    /// Base64 QR image, when the bridge returned one on creation.
    pub qr_code: Option<String>,
}

// --- Realtime ---

/// Payloads pushed to realtime subscribers of a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    ConnectionChanged {
        instance: String,
        status: ConnectionStatus,
    },
    QrReady {
        instance: String,
        qr_code: String,
    },
    MessageReceived {
        from: String,
        text: String,
    },
    BookingConfirmed {
        booking_id: String,
        slot_key: SlotKey,
        wa_number: String,
        start_at: String,
    },
}

impl RealtimeEvent {
    /// The serialized `type` tag, usable as an SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionChanged { .. } => "connection_changed",
            Self::QrReady { .. } => "qr_ready",
            Self::MessageReceived { .. } => "message_received",
            Self::BookingConfirmed { .. } => "booking_confirmed",
        }
    }
}

/// A realtime event addressed to one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantEvent {
    pub tenant_id: String,
    pub event: RealtimeEvent,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap()
    }

    fn held_slot(until: DateTime<Utc>, owner: Option<&str>) -> Slot {
        Slot {
            slot_key: SlotKey::derive("t1", "default", &at(16, 0)),
            tenant_id: "t1".into(),
            resource_id: "default".into(),
            start_at: at(16, 0),
            end_at: at(17, 0),
            status: SlotStatus::Held,
            hold_until: Some(until),
            held_by: owner.map(str::to_string),
            gc_at: None,
            updated_at: at(12, 0),
        }
    }

    #[test]
    fn slot_key_is_deterministic_and_millisecond_iso() {
        let a = SlotKey::derive("acme", "chair-1", &at(16, 0));
        let b = SlotKey::derive("acme", "chair-1", &at(16, 0));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "acme#chair-1#2026-10-19T16:00:00.000Z");
    }

    #[test]
    fn state_key_layout() {
        assert_eq!(StateKey::new("mvp", "5215550001").as_str(), "mvp:5215550001");
    }

    #[test]
    fn expired_hold_is_acquirable() {
        let slot = held_slot(at(12, 0), Some("a"));
        assert!(slot.is_acquirable(&at(12, 1)));
        assert!(!slot.is_acquirable(&at(12, 0)), "expiry must be strictly before now");
    }

    #[test]
    fn live_hold_respects_owner() {
        let slot = held_slot(at(12, 5), Some("a"));
        assert!(slot.is_live_hold_for("a", &at(12, 0)));
        assert!(!slot.is_live_hold_for("b", &at(12, 0)));
        assert!(!slot.is_live_hold_for("a", &at(12, 6)));

        let anonymous = held_slot(at(12, 5), None);
        assert!(anonymous.is_live_hold_for("anyone", &at(12, 0)));
    }

    #[test]
    fn booked_slot_is_never_acquirable() {
        let mut slot = held_slot(at(12, 0), None);
        slot.status = SlotStatus::Booked;
        slot.hold_until = None;
        assert!(!slot.is_acquirable(&at(23, 0)));
    }

    #[test]
    fn patch_on_empty_state_uses_default_bot() {
        let state = StatePatch::fsm("WELCOME").apply(None, "menu-basic");
        assert_eq!(state.bot_key, "menu-basic");
        assert_eq!(state.fsm.as_deref(), Some("WELCOME"));
        assert!(state.data.is_empty());
    }

    #[test]
    fn patch_keeps_bot_and_unset_fields() {
        let mut current = ConversationState::new("reservas-basic");
        current.fsm = Some("SLOT_HELD".into());
        current.data.insert("k".into(), json!(1));

        let state = StatePatch::default().apply(Some(current.clone()), "menu-basic");
        assert_eq!(state, current);
    }

    #[test]
    fn switching_bot_drops_previous_payload() {
        let mut current = ConversationState::new("reservas-basic");
        current.fsm = Some("CONFIRMED".into());
        current.data.insert("bookingId".into(), json!("bk_1"));

        let state = StatePatch::bot("simple-ai").apply(Some(current), "menu-basic");
        assert_eq!(state.bot_key, "simple-ai");
        assert!(state.fsm.is_none());
        assert!(state.data.is_empty());
    }

    #[test]
    fn switching_bot_with_explicit_fsm() {
        let state = StatePatch::bot("reservas-basic")
            .with_fsm("WELCOME")
            .apply(Some(ConversationState::new("menu-basic")), "menu-basic");
        assert_eq!(state.fsm.as_deref(), Some("WELCOME"));
    }

    #[test]
    fn without_fsm_clears_label() {
        let mut current = ConversationState::new("menu-basic");
        current.fsm = Some("X".into());
        let state = StatePatch::default().without_fsm().apply(Some(current), "menu-basic");
        assert!(state.fsm.is_none());
    }

    #[test]
    fn confirmed_booking_has_created_audit_entry() {
        let slot = held_slot(at(12, 5), Some("521"));
        let booking = Booking::confirmed(&slot, "521", at(12, 1));
        assert!(booking.booking_id.starts_with("bk_"));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.audit.len(), 1);
        assert_eq!(booking.audit[0].action, "created");
        assert_eq!(booking.audit[0].by, "521");
        assert_eq!(booking.slot_key, slot.slot_key);
    }

    #[test]
    fn realtime_event_is_tagged() {
        let event = RealtimeEvent::ConnectionChanged {
            instance: "wa-mvp".into(),
            status: ConnectionStatus::Connected,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "connection_changed");
        assert_eq!(value["type"], event.kind());
        assert_eq!(value["status"], "connected");
    }

    #[test]
    fn denial_reason_display() {
        assert_eq!(DenialReason::Contended.to_string(), "slot not available");
        assert_eq!(
            DenialReason::StorageFault("disk".into()).to_string(),
            "database error: disk"
        );
    }
}
