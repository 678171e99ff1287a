// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage, slot ledger, and state store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use wagate_config::model::StorageConfig;
use wagate_core::types::{ConversationState, FinalizeRequest, HoldRequest, StateKey};
use wagate_core::{
    AdapterType, Booking, ConfirmOutcome, DenialReason, HealthStatus, HoldOutcome,
    PluginAdapter, Slot, SlotKey, SlotLedger, StateStore, StorageAdapter, WagateError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on [`StorageAdapter::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, WagateError> {
        self.db.get().ok_or_else(|| WagateError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), WagateError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WagateError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WagateError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), WagateError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| WagateError::Storage {
            source: "storage already initialized".into(),
        })?;
        info!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), WagateError> {
        self.db()?;
        self.checkpoint().await
    }
}

#[async_trait]
impl SlotLedger for SqliteStorage {
    async fn acquire_hold(
        &self,
        request: &HoldRequest,
        now: DateTime<Utc>,
    ) -> Result<HoldOutcome, WagateError> {
        let slot_key = request.slot_key();
        match queries::slots::acquire_hold(self.db()?, request, now).await? {
            Some(hold_until) => {
                debug!(%slot_key, requester = ?request.requester, "hold granted");
                Ok(HoldOutcome::Granted {
                    slot_key,
                    hold_until,
                })
            }
            None => {
                debug!(%slot_key, requester = ?request.requester, "hold contended");
                Ok(HoldOutcome::Denied {
                    slot_key,
                    reason: DenialReason::Contended,
                })
            }
        }
    }

    async fn finalize_booking(
        &self,
        request: &FinalizeRequest,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, WagateError> {
        match queries::slots::finalize_booking(self.db()?, request, now).await? {
            Some(booking) => Ok(ConfirmOutcome::Confirmed(Box::new(booking))),
            None => Ok(ConfirmOutcome::Denied {
                slot_key: request.slot_key(),
                reason: DenialReason::NotHeld,
            }),
        }
    }

    async fn release(&self, slot_key: &SlotKey) -> Result<bool, WagateError> {
        queries::slots::release(self.db()?, slot_key, Utc::now()).await
    }

    async fn get_slot(&self, slot_key: &SlotKey) -> Result<Option<Slot>, WagateError> {
        queries::slots::get_slot(self.db()?, slot_key).await
    }

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, WagateError> {
        queries::bookings::get_booking(self.db()?, booking_id).await
    }

    async fn list_bookings(&self, tenant_id: &str) -> Result<Vec<Booking>, WagateError> {
        queries::bookings::list_bookings(self.db()?, tenant_id).await
    }

    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> Result<usize, WagateError> {
        queries::slots::purge_expired_holds(self.db()?, now).await
    }
}

#[async_trait]
impl StateStore for SqliteStorage {
    async fn get(&self, key: &StateKey) -> Result<Option<ConversationState>, WagateError> {
        queries::conversations::get_state(self.db()?, key).await
    }

    async fn set(
        &self,
        key: &StateKey,
        state: ConversationState,
    ) -> Result<ConversationState, WagateError> {
        let now_ms = Utc::now().timestamp_millis();
        queries::conversations::put_state(self.db()?, key, state, now_ms).await
    }

    async fn clear(&self, key: &StateKey) -> Result<(), WagateError> {
        queries::conversations::delete_state(self.db()?, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
            state_backend: "sqlite".to_string(),
        }
    }

    async fn initialized() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("adapter.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn sqlite_storage_identity() {
        let storage = SqliteStorage::new(make_config("/tmp/unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let storage = SqliteStorage::new(make_config("/tmp/unused.db"));
        let err = StateStore::get(&storage, &StateKey::new("t", "u"))
            .await
            .unwrap_err();
        assert!(err.is_storage());
        assert!(storage.health_check().await.is_err());
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let (storage, _dir) = initialized().await;
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_after_initialize() {
        let (storage, _dir) = initialized().await;
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn ledger_outcomes_carry_reasons() {
        let (storage, _dir) = initialized().await;
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 16, 0, 0).unwrap();
        let request = |who: &str| HoldRequest {
            tenant_id: "mvp".into(),
            resource_id: "default".into(),
            start_at: start,
            end_at: start + chrono::Duration::hours(1),
            hold_for: Duration::from_secs(180),
            requester: Some(who.into()),
        };

        assert!(storage.acquire_hold(&request("a"), now).await.unwrap().is_granted());
        match storage.acquire_hold(&request("b"), now).await.unwrap() {
            HoldOutcome::Denied { reason, slot_key } => {
                assert_eq!(reason, DenialReason::Contended);
                assert_eq!(slot_key, request("b").slot_key());
            }
            other => panic!("expected contention, got {other:?}"),
        }

        let finalize = FinalizeRequest {
            tenant_id: "mvp".into(),
            resource_id: "default".into(),
            start_at: start,
            wa_number: "b".into(),
        };
        match storage.finalize_booking(&finalize, now).await.unwrap() {
            ConfirmOutcome::Denied { reason, .. } => assert_eq!(reason, DenialReason::NotHeld),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn state_store_stamps_update_time() {
        let (storage, _dir) = initialized().await;
        let key = StateKey::new("mvp", "u1");

        let before = Utc::now().timestamp_millis();
        let stored = storage
            .set(&key, ConversationState::new("menu-basic"))
            .await
            .unwrap();
        assert!(stored.updated_at >= before);

        assert_eq!(StateStore::get(&storage, &key).await.unwrap(), Some(stored));
        storage.clear(&key).await.unwrap();
        assert_eq!(StateStore::get(&storage, &key).await.unwrap(), None);
    }
}
