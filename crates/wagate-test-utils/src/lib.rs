// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wagate integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a running bridge or completion service.
//!
//! # Components
//!
//! - [`MockBridge`] - Messaging bridge that captures outbound texts
//! - [`MockCompletion`] - Completion provider with queued replies
//! - [`MockChannel`] - Inbound channel with message injection
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`TestHarness`] - Temp SQLite storage wired into a full bot runtime

pub mod harness;
pub mod mock_bridge;
pub mod mock_channel;
pub mod mock_completion;

pub use harness::{LedgerLayer, TestHarness, TestHarnessBuilder};
pub use mock_bridge::{MockBridge, SentText};
pub use mock_channel::MockChannel;
pub use mock_completion::MockCompletion;
pub use wagate_bots::ManualClock;
