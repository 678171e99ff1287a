// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation testing.
//!
//! `TestHarness` wires a temp SQLite database, a manual clock, the mock
//! bridge and completion provider, and the standard bot registry into a
//! [`BotRuntime`], exactly as `wagate serve` does with real adapters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use wagate_bots::{
    BookingRepository, BotRuntime, ManualClock, ReservationSettings, RuntimeSettings,
    TurnOutcome, standard_registry,
};
use wagate_bus::EventBus;
use wagate_config::WagateConfig;
use wagate_config::model::StorageConfig;
use wagate_core::{
    CompletionProvider, ConversationState, InboundMessage, SlotLedger, StateKey, StateStore,
    StorageAdapter, WagateError,
};
use wagate_storage::SqliteStorage;

use crate::mock_bridge::MockBridge;
use crate::mock_completion::MockCompletion;

/// Wraps the SQLite ledger before the booking repository sees it.
pub type LedgerLayer = Box<dyn FnOnce(Arc<SqliteStorage>) -> Arc<dyn SlotLedger> + Send>;

/// Builder for configuring a [`TestHarness`].
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    hold: Option<Duration>,
    serialize_per_user: bool,
    with_completion: bool,
    start: DateTime<Utc>,
    ledger_layer: Option<LedgerLayer>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            hold: None,
            serialize_per_user: true,
            with_completion: true,
            // Morning, so both offered slots are still ahead.
            start: Utc
                .with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
                .single()
                .unwrap_or_default(),
            ledger_layer: None,
        }
    }

    /// Queue completion replies.
    pub fn with_completion_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Build the assistant bot without a completion provider.
    pub fn without_completion(mut self) -> Self {
        self.with_completion = false;
        self
    }

    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = Some(hold);
        self
    }

    pub fn serialize_per_user(mut self, enabled: bool) -> Self {
        self.serialize_per_user = enabled;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Route every ledger call of the bots through `layer`, e.g. to inject faults.
    pub fn with_ledger_layer(
        mut self,
        layer: impl FnOnce(Arc<SqliteStorage>) -> Arc<dyn SlotLedger> + Send + 'static,
    ) -> Self {
        self.ledger_layer = Some(Box::new(layer));
        self
    }

    pub async fn build(self) -> Result<TestHarness, WagateError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| WagateError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = WagateConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        config.runtime.serialize_per_user = self.serialize_per_user;
        if let Some(hold) = self.hold {
            config.reservation.hold_ms = u64::try_from(hold.as_millis()).unwrap_or(u64::MAX);
        }

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let clock = Arc::new(ManualClock::new(self.start));
        let ledger: Arc<dyn SlotLedger> = match self.ledger_layer {
            Some(layer) => layer(storage.clone()),
            None => storage.clone(),
        };
        let bookings = BookingRepository::new(ledger, clock.clone());
        let bridge = Arc::new(MockBridge::new());
        let completion = Arc::new(MockCompletion::with_replies(self.replies));
        let bus = EventBus::default();

        let provider: Option<Arc<dyn CompletionProvider>> = if self.with_completion {
            Some(completion.clone() as Arc<dyn CompletionProvider>)
        } else {
            None
        };
        let registry = standard_registry(
            bookings.clone(),
            ReservationSettings::from_config(&config.reservation),
            provider,
        );
        let runtime = BotRuntime::new(
            RuntimeSettings::from_config(&config),
            storage.clone(),
            bridge.clone(),
            Arc::new(registry),
        )
        .with_events(Arc::new(bus.clone()));

        Ok(TestHarness {
            tenant_id: config.service.default_tenant.clone(),
            bridge,
            completion,
            clock,
            storage,
            bookings,
            bus,
            runtime: Arc::new(runtime),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete conversation stack over temp storage.
pub struct TestHarness {
    /// Tenant used by [`TestHarness::send`].
    pub tenant_id: String,
    pub bridge: Arc<MockBridge>,
    pub completion: Arc<MockCompletion>,
    pub clock: Arc<ManualClock>,
    /// Ledger and state store (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    pub bookings: BookingRepository,
    pub bus: EventBus,
    pub runtime: Arc<BotRuntime>,
    pub config: WagateConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Process one message from `from` in the default tenant.
    pub async fn send(&self, from: &str, text: &str) -> Result<TurnOutcome, WagateError> {
        let tenant_id = self.tenant_id.clone();
        self.send_as(&tenant_id, from, text).await
    }

    pub async fn send_as(
        &self,
        tenant_id: &str,
        from: &str,
        text: &str,
    ) -> Result<TurnOutcome, WagateError> {
        self.runtime
            .process(InboundMessage {
                id: format!("test-{}", uuid::Uuid::new_v4()),
                tenant_id: tenant_id.to_string(),
                from: from.to_string(),
                text: text.to_string(),
                received_at: Utc::now(),
            })
            .await
    }

    /// Stored conversation state of `from` in the default tenant.
    pub async fn state(&self, from: &str) -> Result<Option<ConversationState>, WagateError> {
        self.storage
            .get(&StateKey::new(&self.tenant_id, from))
            .await
    }

    /// Every text sent to `from`, oldest first.
    pub async fn replies_to(&self, from: &str) -> Vec<String> {
        self.bridge.sent_to(from).await
    }

    pub async fn last_reply(&self, from: &str) -> Option<String> {
        self.bridge.last_to(from).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(harness.tenant_id, "mvp");
        assert!(harness.state("5215550001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_message_gets_the_menu() {
        let harness = TestHarness::builder().build().await.unwrap();
        let outcome = harness.send("5215550001", "hola").await.unwrap();
        assert!(outcome.is_handled());
        let reply = harness.last_reply("5215550001").await.unwrap();
        assert!(reply.contains("Reservar una cita"));
    }
}
