// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter and collaborator traits.

pub mod adapter;
pub mod bridge;
pub mod channel;
pub mod completion;
pub mod events;
pub mod ledger;
pub mod state;
pub mod storage;

pub use adapter::PluginAdapter;
pub use bridge::MessagingBridge;
pub use channel::ChannelAdapter;
pub use completion::CompletionProvider;
pub use events::EventSink;
pub use ledger::SlotLedger;
pub use state::StateStore;
pub use storage::StorageAdapter;
