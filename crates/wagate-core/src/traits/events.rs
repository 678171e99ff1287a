// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime publish sink.

use crate::types::RealtimeEvent;

/// Fire-and-forget, per-tenant publish. Delivery is best effort.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, tenant_id: &str, event: RealtimeEvent);
}
