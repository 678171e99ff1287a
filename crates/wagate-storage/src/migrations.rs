// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations (refinery). Applied on every database open.

use wagate_core::WagateError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply pending migrations. Refinery records progress in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), WagateError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| WagateError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
