// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot ledger trait: the conditional-write store behind slot holds and bookings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WagateError;
use crate::types::{
    Booking, ConfirmOutcome, FinalizeRequest, HoldOutcome, HoldRequest, Slot, SlotKey,
};

/// Authoritative slot status with atomic acquisition.
///
/// Contention is reported as a `Denied` outcome. `Err` is reserved for
/// genuine storage faults. Implementations must evaluate every precondition
/// atomically in the storage layer; callers never read-then-write a slot.
#[async_trait]
pub trait SlotLedger: Send + Sync + 'static {
    /// Takes (or refreshes an expired) hold. Granted iff the slot row is
    /// absent, free, or held with `hold_until < now`.
    async fn acquire_hold(
        &self,
        request: &HoldRequest,
        now: DateTime<Utc>,
    ) -> Result<HoldOutcome, WagateError>;

    /// Moves a live hold to booked and creates the paired booking in one
    /// atomic step. No booking exists unless the slot transition happened.
    async fn finalize_booking(
        &self,
        request: &FinalizeRequest,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, WagateError>;

    /// Unconditionally frees a slot. Returns false when no row existed.
    async fn release(&self, slot_key: &SlotKey) -> Result<bool, WagateError>;

    async fn get_slot(&self, slot_key: &SlotKey) -> Result<Option<Slot>, WagateError>;

    async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, WagateError>;

    async fn list_bookings(&self, tenant_id: &str) -> Result<Vec<Booking>, WagateError>;

    /// Deletes abandoned hold rows whose GC marker has passed. Returns the
    /// number of rows removed. Storage hygiene only.
    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> Result<usize, WagateError>;
}
