// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state persistence keyed by `{tenant}:{user}`.

use rusqlite::{OptionalExtension, params};
use serde_json::{Map, Value};
use wagate_core::{ConversationState, StateKey, WagateError};

use crate::database::Database;

/// Fetch the state for a key.
pub async fn get_state(
    db: &Database,
    key: &StateKey,
) -> Result<Option<ConversationState>, WagateError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT bot_key, fsm, data, updated_at FROM conversation_state
                 WHERE state_key = ?1",
                params![key],
                |row| {
                    let data: String = row.get(2)?;
                    let data: Map<String, Value> = serde_json::from_str(&data).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(ConversationState {
                        bot_key: row.get(0)?,
                        fsm: row.get(1)?,
                        data,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the state for a key, stamping `updated_at_ms`.
pub async fn put_state(
    db: &Database,
    key: &StateKey,
    mut state: ConversationState,
    updated_at_ms: i64,
) -> Result<ConversationState, WagateError> {
    state.updated_at = updated_at_ms;
    let data = serde_json::to_string(&state.data).map_err(|e| WagateError::Storage {
        source: Box::new(e),
    })?;
    let key = key.0.clone();
    let bot_key = state.bot_key.clone();
    let fsm = state.fsm.clone();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_state (state_key, bot_key, fsm, data, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(state_key) DO UPDATE SET
                     bot_key = excluded.bot_key,
                     fsm = excluded.fsm,
                     data = excluded.data,
                     updated_at = excluded.updated_at",
                params![key, bot_key, fsm, data, updated_at_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    Ok(state)
}

/// Remove the state for a key. Missing keys are not an error.
pub async fn delete_state(db: &Database, key: &StateKey) -> Result<(), WagateError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM conversation_state WHERE state_key = ?1",
                params![key],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
