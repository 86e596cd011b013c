//! Append-only audit storage schema. Unlike a memory/preference store, the
//! audit trail never updates or deletes a row once written (spec.md §4.10
//! "Records are appended to an external store").

use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    create_calls_table(conn)?;
    create_transcripts_table(conn)?;
    create_events_table(conn)?;
    create_turn_audit_table(conn)?;
    Ok(())
}

fn create_calls_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_calls (
            call_id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL,
            from_addr TEXT,
            to_addr TEXT,
            source TEXT,
            session_snapshot TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_calls_company ON audit_calls (company_id)",
        [],
    )?;
    Ok(())
}

fn create_transcripts_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_transcripts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL,
            company_id TEXT NOT NULL,
            speaker TEXT NOT NULL,
            turn INTEGER NOT NULL,
            text TEXT NOT NULL,
            confidence REAL,
            source TEXT,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_transcripts_call ON audit_transcripts (call_id, turn)",
        [],
    )?;
    Ok(())
}

fn create_events_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            data TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_events_call ON audit_events (call_id)",
        [],
    )?;
    Ok(())
}

fn create_turn_audit_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_turns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            call_id TEXT NOT NULL,
            company_id TEXT NOT NULL,
            channel TEXT NOT NULL,
            session_id TEXT NOT NULL,
            turn_number INTEGER NOT NULL,
            turn_trace_id TEXT NOT NULL,
            record TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_turns_session ON audit_turns (session_id, turn_number)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_turns_company ON audit_turns (company_id)",
        [],
    )?;
    Ok(())
}
