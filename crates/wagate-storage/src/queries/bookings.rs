// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking record reads and the in-transaction insert used by finalize.

use rusqlite::{OptionalExtension, Row, params};
use wagate_core::types::{AuditEntry, iso_millis};
use wagate_core::{Booking, SlotKey, WagateError};

use crate::database::Database;
use crate::queries::{parse_enum, parse_ts};

const BOOKING_COLUMNS: &str = "booking_id, tenant_id, wa_number, resource_id, slot_key, \
                               start_at, end_at, status, created_at, audit";

fn booking_from_row(row: &Row<'_>) -> Result<Booking, rusqlite::Error> {
    let start_at: String = row.get(5)?;
    let end_at: String = row.get(6)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let audit: String = row.get(9)?;
    let audit: Vec<AuditEntry> = serde_json::from_str(&audit).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Booking {
        booking_id: row.get(0)?,
        tenant_id: row.get(1)?,
        wa_number: row.get(2)?,
        resource_id: row.get(3)?,
        slot_key: SlotKey(row.get(4)?),
        start_at: parse_ts(5, &start_at)?,
        end_at: parse_ts(6, &end_at)?,
        status: parse_enum(7, &status)?,
        created_at: parse_ts(8, &created_at)?,
        audit,
    })
}

/// Insert a booking row. Runs inside the caller's transaction.
pub(crate) fn insert_booking(
    tx: &rusqlite::Transaction<'_>,
    booking: &Booking,
) -> Result<(), rusqlite::Error> {
    let audit = serde_json::to_string(&booking.audit)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    tx.execute(
        "INSERT INTO bookings (booking_id, tenant_id, wa_number, resource_id, slot_key,
                               start_at, end_at, status, created_at, audit)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.booking_id,
            booking.tenant_id,
            booking.wa_number,
            booking.resource_id,
            booking.slot_key.0,
            iso_millis(&booking.start_at),
            iso_millis(&booking.end_at),
            booking.status.to_string(),
            iso_millis(&booking.created_at),
            audit,
        ],
    )?;
    Ok(())
}

/// Fetch a booking by ID.
pub async fn get_booking(db: &Database, booking_id: &str) -> Result<Option<Booking>, WagateError> {
    let booking_id = booking_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = ?1"),
                params![booking_id],
                booking_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All bookings of a tenant, oldest first.
pub async fn list_bookings(db: &Database, tenant_id: &str) -> Result<Vec<Booking>, WagateError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE tenant_id = ?1
                 ORDER BY created_at ASC, booking_id ASC"
            ))?;
            let rows = stmt.query_map(params![tenant_id], booking_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tempfile::tempdir;
    use wagate_core::{FinalizeRequest, HoldRequest};

    use crate::queries::slots;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn book(db: &Database, tenant: &str, hour: u32, who: &str) -> Booking {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap();
        let hold = HoldRequest {
            tenant_id: tenant.into(),
            resource_id: "default".into(),
            start_at: start,
            end_at: start + chrono::Duration::hours(1),
            hold_for: Duration::from_secs(60),
            requester: Some(who.into()),
        };
        slots::acquire_hold(db, &hold, now).await.unwrap().unwrap();
        let finalize = FinalizeRequest {
            tenant_id: tenant.into(),
            resource_id: "default".into(),
            start_at: start,
            wa_number: who.into(),
        };
        slots::finalize_booking(db, &finalize, now).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn get_missing_booking_is_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_booking(&db, "bk_nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_is_scoped_to_tenant() {
        let (db, _dir) = setup_db().await;

        let a1 = book(&db, "acme", 10, "111").await;
        let a2 = book(&db, "acme", 11, "222").await;
        book(&db, "other", 10, "333").await;

        let listed = list_bookings(&db, "acme").await.unwrap();
        let mut ids: Vec<_> = listed.iter().map(|b| b.booking_id.clone()).collect();
        ids.sort();
        let mut expected = vec![a1.booking_id, a2.booking_id];
        expected.sort();
        assert_eq!(ids, expected);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn audit_trail_survives_storage() {
        let (db, _dir) = setup_db().await;

        let booking = book(&db, "acme", 12, "444").await;
        let stored = get_booking(&db, &booking.booking_id).await.unwrap().unwrap();
        assert_eq!(stored.audit.len(), 1);
        assert_eq!(stored.audit[0].action, "created");
        assert_eq!(stored.audit[0].by, "444");

        db.close().await.unwrap();
    }
}
