// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the wagate messaging gateway.
//!
//! This crate provides the error type, the domain types of the slot ledger
//! and conversation runtime, and the traits every adapter implements.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ProviderFailure, WagateError};
pub use types::{
    AdapterType, AuditEntry, Booking, BookingStatus, ConfirmOutcome, ConnectionStatus,
    ConversationState, DenialReason, FinalizeRequest, HealthStatus, HoldOutcome, HoldRequest,
    InboundMessage, InstanceInfo, MessageId, RealtimeEvent, Slot, SlotKey, SlotStatus, StateKey,
    StatePatch, TenantEvent, iso_millis,
};

pub use traits::{
    ChannelAdapter, CompletionProvider, EventSink, MessagingBridge, PluginAdapter, SlotLedger,
    StateStore, StorageAdapter,
};
