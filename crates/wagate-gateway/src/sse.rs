// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events stream of realtime tenant events.
//!
//! SSE event format:
//! ```text
//! event: booking_confirmed
//! data: {"tenant_id":"mvp","event":{"type":"booking_confirmed",...},"published_at":"..."}
//! ```

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tracing::{debug, warn};

use wagate_core::TenantEvent;

use crate::server::GatewayState;

/// Query string of GET /v1/events.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub tenant: Option<String>,
}

/// Render one tenant event as an SSE frame named after its type.
pub fn to_sse_event(event: &TenantEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().event(event.event.kind()).data(json),
        Err(e) => {
            warn!(error = %e, "failed to serialize realtime event");
            Event::default()
                .event("error")
                .data(r#"{"error": "unserializable event"}"#)
        }
    }
}

/// GET /v1/events: stream the tenant's realtime events until the client leaves.
pub async fn get_events(
    State(state): State<GatewayState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let tenant = query
        .tenant
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| state.default_tenant.clone());
    debug!(tenant_id = %tenant, "realtime subscriber connected");

    let subscription = state.bus.subscribe(tenant);
    let events = stream::unfold(subscription, |mut subscription| async move {
        let event = subscription.recv().await?;
        Some((Ok(to_sse_event(&event)), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
