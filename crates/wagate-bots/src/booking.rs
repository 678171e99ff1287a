// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking repository: the domain-level facade over the slot ledger.
//!
//! Every call delegates exactly once to a ledger primitive. Storage faults
//! are logged and folded into a `Denied { StorageFault }` outcome so the
//! conversation keeps moving.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wagate_core::{
    ConfirmOutcome, DenialReason, FinalizeRequest, HoldOutcome, HoldRequest, Slot, SlotKey,
    SlotLedger, WagateError,
};

use crate::clock::Clock;

/// Hold, confirm and release slots on behalf of conversation handlers.
#[derive(Clone)]
pub struct BookingRepository {
    ledger: Arc<dyn SlotLedger>,
    clock: Arc<dyn Clock>,
}

impl BookingRepository {
    pub fn new(ledger: Arc<dyn SlotLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// The repository's notion of "now".
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Slot key for a tenant/resource/start. Same derivation the ledger uses.
    pub fn slot_key(tenant_id: &str, resource_id: &str, start_at: &DateTime<Utc>) -> SlotKey {
        SlotKey::derive(tenant_id, resource_id, start_at)
    }

    /// acquire-or-refresh-hold.
    pub async fn hold(&self, request: &HoldRequest) -> HoldOutcome {
        match self.ledger.acquire_hold(request, self.clock.now()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let slot_key = request.slot_key();
                error!(%slot_key, error = %e, "slot hold failed in storage");
                HoldOutcome::Denied {
                    slot_key,
                    reason: DenialReason::StorageFault(e.to_string()),
                }
            }
        }
    }

    /// finalize-booking.
    pub async fn confirm(&self, request: &FinalizeRequest) -> ConfirmOutcome {
        match self.ledger.finalize_booking(request, self.clock.now()).await {
            Ok(ConfirmOutcome::Confirmed(booking)) => {
                info!(
                    booking_id = %booking.booking_id,
                    slot_key = %booking.slot_key,
                    tenant_id = %booking.tenant_id,
                    "booking confirmed"
                );
                ConfirmOutcome::Confirmed(booking)
            }
            Ok(denied) => {
                debug!(slot_key = %request.slot_key(), "confirm denied");
                denied
            }
            Err(e) => {
                let slot_key = request.slot_key();
                error!(%slot_key, error = %e, "booking confirm failed in storage");
                ConfirmOutcome::Denied {
                    slot_key,
                    reason: DenialReason::StorageFault(e.to_string()),
                }
            }
        }
    }

    /// Free a slot. Unlike hold/confirm, storage faults are returned.
    pub async fn release(&self, slot_key: &SlotKey) -> Result<bool, WagateError> {
        self.ledger.release(slot_key).await
    }

    /// Current ledger row for a slot.
    pub async fn get_slot(&self, slot_key: &SlotKey) -> Result<Option<Slot>, WagateError> {
        self.ledger.get_slot(slot_key).await
    }
}

/// Periodically purge abandoned hold rows until `cancel` fires.
///
/// Correctness never depends on this task; expired holds are already
/// reclaimable by the acquisition predicate.
pub fn spawn_hold_reaper(
    ledger: Arc<dyn SlotLedger>,
    clock: Arc<dyn Clock>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match ledger.purge_expired_holds(clock.now()).await {
                        Ok(0) => {}
                        Ok(purged) => debug!(purged, "purged abandoned slot holds"),
                        Err(e) => warn!(error = %e, "hold purge failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("hold reaper stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wagate_core::Booking;

    use crate::clock::ManualClock;

    /// Ledger whose every call fails, counting purge attempts.
    #[derive(Default)]
    struct BrokenLedger {
        purges: AtomicUsize,
    }

    fn fault() -> WagateError {
        WagateError::Storage {
            source: "disk I/O error".into(),
        }
    }

    #[async_trait]
    impl SlotLedger for BrokenLedger {
        async fn acquire_hold(
            &self,
            _request: &HoldRequest,
            _now: DateTime<Utc>,
        ) -> Result<HoldOutcome, WagateError> {
            Err(fault())
        }

        async fn finalize_booking(
            &self,
            _request: &FinalizeRequest,
            _now: DateTime<Utc>,
        ) -> Result<ConfirmOutcome, WagateError> {
            Err(fault())
        }

        async fn release(&self, _slot_key: &SlotKey) -> Result<bool, WagateError> {
            Err(fault())
        }

        async fn get_slot(&self, _slot_key: &SlotKey) -> Result<Option<Slot>, WagateError> {
            Err(fault())
        }

        async fn get_booking(&self, _booking_id: &str) -> Result<Option<Booking>, WagateError> {
            Err(fault())
        }

        async fn list_bookings(&self, _tenant_id: &str) -> Result<Vec<Booking>, WagateError> {
            Err(fault())
        }

        async fn purge_expired_holds(&self, _now: DateTime<Utc>) -> Result<usize, WagateError> {
            self.purges.fetch_add(1, Ordering::SeqCst);
            Err(fault())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 16, 0, 0).unwrap()
    }

    fn repo(ledger: Arc<BrokenLedger>) -> BookingRepository {
        BookingRepository::new(ledger, Arc::new(ManualClock::new(start())))
    }

    #[tokio::test]
    async fn storage_fault_on_hold_becomes_denial() {
        let repo = repo(Arc::new(BrokenLedger::default()));
        let request = HoldRequest {
            tenant_id: "mvp".into(),
            resource_id: "default".into(),
            start_at: start(),
            end_at: start() + chrono::Duration::hours(1),
            hold_for: Duration::from_secs(180),
            requester: None,
        };

        match repo.hold(&request).await {
            HoldOutcome::Denied {
                reason: DenialReason::StorageFault(msg),
                slot_key,
            } => {
                assert!(msg.contains("disk I/O error"));
                assert_eq!(slot_key, request.slot_key());
            }
            other => panic!("expected storage fault denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn storage_fault_on_confirm_becomes_denial() {
        let repo = repo(Arc::new(BrokenLedger::default()));
        let request = FinalizeRequest {
            tenant_id: "mvp".into(),
            resource_id: "default".into(),
            start_at: start(),
            wa_number: "521".into(),
        };
        let outcome = repo.confirm(&request).await;
        assert!(matches!(
            outcome,
            ConfirmOutcome::Denied {
                reason: DenialReason::StorageFault(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn release_propagates_storage_fault() {
        let repo = repo(Arc::new(BrokenLedger::default()));
        assert!(repo.release(&SlotKey("k".into())).await.is_err());
    }

    #[test]
    fn slot_key_matches_core_derivation() {
        assert_eq!(
            BookingRepository::slot_key("mvp", "default", &start()).as_str(),
            "mvp#default#2026-10-19T16:00:00.000Z"
        );
    }

    #[tokio::test]
    async fn reaper_runs_until_cancelled() {
        let ledger = Arc::new(BrokenLedger::default());
        let cancel = CancellationToken::new();
        let handle = spawn_hold_reaper(
            ledger.clone(),
            Arc::new(ManualClock::new(start())),
            Duration::from_millis(5),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(ledger.purges.load(Ordering::SeqCst) >= 1);
    }
}
