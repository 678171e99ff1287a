// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime event bus.
//!
//! A single broadcast channel carries [`TenantEvent`]s; subscribers pick the
//! tenant they care about. Publishing never blocks and never fails: with no
//! subscribers the event is dropped, and slow subscribers lag.

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::trace;

use wagate_core::EventSink;
use wagate_core::types::{RealtimeEvent, TenantEvent};

/// Default number of buffered events per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast-backed [`EventSink`].
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TenantEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events of one tenant.
    pub fn subscribe(&self, tenant_id: impl Into<String>) -> TenantSubscription {
        TenantSubscription {
            tenant_id: tenant_id.into(),
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions across all tenants.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventSink for EventBus {
    fn publish(&self, tenant_id: &str, event: RealtimeEvent) {
        let event = TenantEvent {
            tenant_id: tenant_id.to_string(),
            event,
            published_at: Utc::now(),
        };
        if self.tx.send(event).is_err() {
            trace!(tenant_id, "no realtime subscribers; event dropped");
        }
    }
}

/// A receiver filtered to one tenant.
#[derive(Debug)]
pub struct TenantSubscription {
    tenant_id: String,
    rx: broadcast::Receiver<TenantEvent>,
}

impl TenantSubscription {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Next event for this tenant, or `None` once the bus is gone.
    ///
    /// Events missed because the subscriber lagged are skipped.
    pub async fn recv(&mut self) -> Option<TenantEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.tenant_id == self.tenant_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(tenant_id = %self.tenant_id, skipped, "realtime subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_core::types::ConnectionStatus;

    fn connected() -> RealtimeEvent {
        RealtimeEvent::ConnectionChanged {
            instance: "wa-mvp".into(),
            status: ConnectionStatus::Connected,
        }
    }

    #[tokio::test]
    async fn subscriber_sees_only_its_tenant() {
        let bus = EventBus::default();
        let mut acme = bus.subscribe("acme");

        bus.publish("other", connected());
        bus.publish(
            "acme",
            RealtimeEvent::QrReady {
                instance: "wa-mvp".into(),
                qr_code: "data".into(),
            },
        );

        let event = acme.recv().await.unwrap();
        assert_eq!(event.tenant_id, "acme");
        assert!(matches!(event.event, RealtimeEvent::QrReady { .. }));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish("acme", connected());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_keeps_receiving() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe("acme");
        for _ in 0..5 {
            bus.publish("acme", connected());
        }
        assert!(sub.recv().await.is_some());
    }

    #[test]
    fn recv_returns_none_after_bus_dropped() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe("acme");
        drop(bus);
        assert!(tokio_test::block_on(sub.recv()).is_none());
    }
}
