// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for the wagate gateway.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer model via
//! `tokio-rusqlite`. Holds the slot ledger, booking records, and
//! conversation state; an in-memory state store is available for
//! deployments that do not need state to survive restarts.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use memory::MemoryStateStore;
