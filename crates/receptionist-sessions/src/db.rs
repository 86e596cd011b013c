use rusqlite::Connection;

use crate::error::Result;

/// Initialise the sessions table and its lookup index.
///
/// The full nested session (slots, booking sub-flow meta, memory, turns) is
/// stored as a single JSON document column — the real deployment target is
/// a document store (spec.md §1, out of scope) and SQLite here stands in
/// for it; the scalar columns exist only so lookup by key and mode doesn't
/// require deserializing every row.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            session_key   TEXT NOT NULL UNIQUE,
            company_id    TEXT NOT NULL,
            channel       TEXT NOT NULL,
            identifier    TEXT NOT NULL,
            mode          TEXT NOT NULL,
            version       INTEGER NOT NULL DEFAULT 0,
            state_json    TEXT NOT NULL,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_company_channel
            ON sessions(company_id, channel, identifier);",
    )?;
    Ok(())
}
