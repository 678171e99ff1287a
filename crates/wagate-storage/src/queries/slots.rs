// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot ledger operations.
//!
//! Acquisition and finalization are each a single conditional statement
//! evaluated by SQLite; a precondition miss shows up as zero changed rows and
//! is returned as `None`/`false`, never as an error.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use wagate_core::types::iso_millis;
use wagate_core::{Booking, FinalizeRequest, HoldRequest, Slot, SlotKey, WagateError};

use crate::database::Database;
use crate::queries::{bookings, parse_enum, parse_millis, parse_ts};

/// Grace period after hold expiry before an abandoned row may be purged.
pub const GC_BUFFER_SECS: i64 = 60;

const SLOT_COLUMNS: &str = "slot_key, tenant_id, resource_id, start_at, end_at, status, \
                            hold_until, held_by, gc_at, updated_at";

pub(crate) fn slot_from_row(row: &Row<'_>) -> Result<Slot, rusqlite::Error> {
    let start_at: String = row.get(3)?;
    let end_at: String = row.get(4)?;
    let status: String = row.get(5)?;
    let hold_until: Option<i64> = row.get(6)?;
    let updated_at: String = row.get(9)?;
    Ok(Slot {
        slot_key: SlotKey(row.get(0)?),
        tenant_id: row.get(1)?,
        resource_id: row.get(2)?,
        start_at: parse_ts(3, &start_at)?,
        end_at: parse_ts(4, &end_at)?,
        status: parse_enum(5, &status)?,
        hold_until: hold_until.map(|ms| parse_millis(6, ms)).transpose()?,
        held_by: row.get(7)?,
        gc_at: row.get(8)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

/// Take a hold if the slot is absent, free, or held with an expired hold.
///
/// Returns the new hold expiry when granted, `None` on contention.
pub async fn acquire_hold(
    db: &Database,
    request: &HoldRequest,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, WagateError> {
    let hold_ms = i64::try_from(request.hold_for.as_millis()).unwrap_or(i64::MAX);
    let hold_until = chrono::Duration::try_milliseconds(hold_ms)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| {
            WagateError::Internal(format!("hold of {hold_ms}ms overflows the timestamp range"))
        })?;
    let hold_until_ms = hold_until.timestamp_millis();
    let gc_at = hold_until_ms / 1000 + GC_BUFFER_SECS;

    let slot_key = request.slot_key().0;
    let tenant_id = request.tenant_id.clone();
    let resource_id = request.resource_id.clone();
    let start_at = iso_millis(&request.start_at);
    let end_at = iso_millis(&request.end_at);
    let held_by = request.requester.clone();
    let now_ms = now.timestamp_millis();
    let now_iso = iso_millis(&now);

    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO slots (slot_key, tenant_id, resource_id, start_at, end_at, status,
                                    hold_until, held_by, gc_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'held', ?6, ?7, ?8, ?9)
                 ON CONFLICT(slot_key) DO UPDATE SET
                     status = 'held',
                     end_at = excluded.end_at,
                     hold_until = excluded.hold_until,
                     held_by = excluded.held_by,
                     gc_at = excluded.gc_at,
                     updated_at = excluded.updated_at
                 WHERE slots.status = 'free'
                    OR (slots.status = 'held'
                        AND (slots.hold_until IS NULL OR slots.hold_until < ?10))",
                params![
                    slot_key,
                    tenant_id,
                    resource_id,
                    start_at,
                    end_at,
                    hold_until_ms,
                    held_by,
                    gc_at,
                    now_iso,
                    now_ms,
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    Ok((changed == 1).then_some(hold_until))
}

/// Move a live hold to booked and insert its booking, in one transaction.
///
/// The slot update requires `status = 'held'`, an unexpired hold, and a
/// matching (or unrecorded) holder. The booking row is only written when that
/// update changed exactly one row. Returns `None` when the precondition failed.
pub async fn finalize_booking(
    db: &Database,
    request: &FinalizeRequest,
    now: DateTime<Utc>,
) -> Result<Option<Booking>, WagateError> {
    let slot_key = request.slot_key().0;
    let wa_number = request.wa_number.clone();
    let now_ms = now.timestamp_millis();
    let now_iso = iso_millis(&now);

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let changed = tx.execute(
                "UPDATE slots
                 SET status = 'booked', hold_until = NULL, gc_at = NULL, held_by = NULL,
                     updated_at = ?3
                 WHERE slot_key = ?1
                   AND status = 'held'
                   AND hold_until >= ?2
                   AND (held_by IS NULL OR held_by = ?4)",
                params![slot_key, now_ms, now_iso, wa_number],
            )?;

            if changed != 1 {
                tx.rollback()?;
                return Ok(None);
            }

            let slot = tx.query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM slots WHERE slot_key = ?1"),
                params![slot_key],
                slot_from_row,
            )?;
            let booking = Booking::confirmed(&slot, &wa_number, now);
            bookings::insert_booking(&tx, &booking)?;

            tx.commit()?;
            Ok(Some(booking))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Reset a slot to free regardless of its current status.
///
/// Returns false when no row exists for `slot_key`.
pub async fn release(
    db: &Database,
    slot_key: &SlotKey,
    now: DateTime<Utc>,
) -> Result<bool, WagateError> {
    let slot_key = slot_key.0.clone();
    let now_iso = iso_millis(&now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE slots
                 SET status = 'free', hold_until = NULL, held_by = NULL, gc_at = NULL,
                     updated_at = ?2
                 WHERE slot_key = ?1",
                params![slot_key, now_iso],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

/// Fetch a slot row by key.
pub async fn get_slot(db: &Database, slot_key: &SlotKey) -> Result<Option<Slot>, WagateError> {
    let slot_key = slot_key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM slots WHERE slot_key = ?1"),
                params![slot_key],
                slot_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete held rows whose GC marker is in the past.
pub async fn purge_expired_holds(db: &Database, now: DateTime<Utc>) -> Result<usize, WagateError> {
    let now_secs = now.timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM slots
                 WHERE status = 'held' AND gc_at IS NOT NULL AND gc_at < ?1",
                params![now_secs],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use wagate_core::SlotStatus;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn hold(requester: &str) -> HoldRequest {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 16, 0, 0).unwrap();
        HoldRequest {
            tenant_id: "mvp".into(),
            resource_id: "default".into(),
            start_at: start,
            end_at: start + chrono::Duration::minutes(60),
            hold_for: Duration::from_secs(180),
            requester: Some(requester.into()),
        }
    }

    fn finalize(wa_number: &str) -> FinalizeRequest {
        let req = hold(wa_number);
        FinalizeRequest {
            tenant_id: req.tenant_id,
            resource_id: req.resource_id,
            start_at: req.start_at,
            wa_number: wa_number.into(),
        }
    }

    #[tokio::test]
    async fn first_hold_creates_row() {
        let (db, _dir) = setup_db().await;

        let until = acquire_hold(&db, &hold("a"), t0()).await.unwrap();
        assert_eq!(until, Some(t0() + chrono::Duration::seconds(180)));

        let slot = get_slot(&db, &hold("a").slot_key()).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Held);
        assert_eq!(slot.held_by.as_deref(), Some("a"));
        assert_eq!(slot.hold_until, until);
        assert_eq!(slot.gc_at, Some(t0().timestamp() + 180 + GC_BUFFER_SECS));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn live_hold_blocks_second_requester() {
        let (db, _dir) = setup_db().await;

        assert!(acquire_hold(&db, &hold("a"), t0()).await.unwrap().is_some());
        let later = t0() + chrono::Duration::seconds(179);
        assert!(acquire_hold(&db, &hold("b"), later).await.unwrap().is_none());

        let slot = get_slot(&db, &hold("a").slot_key()).await.unwrap().unwrap();
        assert_eq!(slot.held_by.as_deref(), Some("a"), "loser must not overwrite");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_hold_is_reclaimed() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("a"), t0()).await.unwrap();
        let after_expiry = t0() + chrono::Duration::seconds(181);
        let until = acquire_hold(&db, &hold("b"), after_expiry).await.unwrap();
        assert!(until.is_some());

        let slot = get_slot(&db, &hold("b").slot_key()).await.unwrap().unwrap();
        assert_eq!(slot.held_by.as_deref(), Some("b"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn hold_expiring_exactly_now_is_not_reclaimable() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("a"), t0()).await.unwrap();
        let at_expiry = t0() + chrono::Duration::seconds(180);
        assert!(acquire_hold(&db, &hold("b"), at_expiry).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn out_of_range_hold_is_an_error_and_writes_nothing() {
        let (db, _dir) = setup_db().await;

        let mut req = hold("a");
        req.hold_for = Duration::from_millis(10_000_000_000_000_000);
        let err = acquire_hold(&db, &req, t0()).await.unwrap_err();
        assert!(matches!(err, WagateError::Internal(_)), "got {err:?}");
        assert!(get_slot(&db, &req.slot_key()).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_holds_grant_exactly_one() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);

        let attempts = (0..16).map(|i| {
            let db = Arc::clone(&db);
            async move { acquire_hold(&db, &hold(&format!("user-{i}")), t0()).await }
        });
        let results = futures::future::join_all(attempts).await;

        let granted = results
            .into_iter()
            .map(|r| r.unwrap())
            .filter(Option::is_some)
            .count();
        assert_eq!(granted, 1);
    }

    #[tokio::test]
    async fn finalize_books_and_creates_booking() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("521"), t0()).await.unwrap();
        let at = t0() + chrono::Duration::seconds(30);
        let booking = finalize_booking(&db, &finalize("521"), at)
            .await
            .unwrap()
            .expect("live hold should finalize");
        assert!(booking.booking_id.starts_with("bk_"));
        assert_eq!(booking.end_at, hold("521").end_at);

        let slot = get_slot(&db, &booking.slot_key).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Booked);
        assert!(slot.hold_until.is_none());
        assert!(slot.gc_at.is_none());

        let stored = bookings::get_booking(&db, &booking.booking_id).await.unwrap();
        assert_eq!(stored, Some(booking));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finalize_after_expiry_creates_nothing() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("521"), t0()).await.unwrap();
        let late = t0() + chrono::Duration::seconds(181);
        assert!(finalize_booking(&db, &finalize("521"), late).await.unwrap().is_none());

        let slot = get_slot(&db, &hold("521").slot_key()).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Held);
        assert!(bookings::list_bookings(&db, "mvp").await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finalize_refuses_other_holder() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("a"), t0()).await.unwrap();
        assert!(finalize_booking(&db, &finalize("b"), t0()).await.unwrap().is_none());
        assert!(bookings::list_bookings(&db, "mvp").await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finalize_without_hold_creates_nothing() {
        let (db, _dir) = setup_db().await;
        assert!(finalize_booking(&db, &finalize("a"), t0()).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn booked_slot_is_terminal() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("a"), t0()).await.unwrap();
        finalize_booking(&db, &finalize("a"), t0()).await.unwrap().unwrap();

        let much_later = t0() + chrono::Duration::days(1);
        assert!(acquire_hold(&db, &hold("b"), much_later).await.unwrap().is_none());
        assert!(finalize_booking(&db, &finalize("a"), t0()).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_frees_a_held_slot() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("a"), t0()).await.unwrap();
        assert!(release(&db, &hold("a").slot_key(), t0()).await.unwrap());

        let slot = get_slot(&db, &hold("a").slot_key()).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Free);
        assert!(slot.hold_until.is_none());
        assert!(acquire_hold(&db, &hold("b"), t0()).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_of_unknown_slot_reports_false() {
        let (db, _dir) = setup_db().await;
        let missing = SlotKey("mvp#default#2000-01-01T00:00:00.000Z".into());
        assert!(!release(&db, &missing, t0()).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn purge_removes_only_abandoned_holds() {
        let (db, _dir) = setup_db().await;

        acquire_hold(&db, &hold("a"), t0()).await.unwrap();

        let before_gc = t0() + chrono::Duration::seconds(180 + GC_BUFFER_SECS - 1);
        assert_eq!(purge_expired_holds(&db, before_gc).await.unwrap(), 0);

        let after_gc = t0() + chrono::Duration::seconds(180 + GC_BUFFER_SECS + 1);
        assert_eq!(purge_expired_holds(&db, after_gc).await.unwrap(), 1);
        assert!(get_slot(&db, &hold("a").slot_key()).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
