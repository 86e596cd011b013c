use rusqlite::Connection;

use crate::error::Result;

/// Creates the `booking_requests` table. The idempotency protocol (spec.md
/// §3 "unique index on `(sessionId, status != CANCELLED)`") is expressed as
/// a partial unique index: SQLite partial indexes support an arbitrary WHERE
/// clause, so "cancelled bookings don't block a retry" falls out for free.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS booking_requests (
            id                    TEXT    NOT NULL PRIMARY KEY,
            company_id            TEXT    NOT NULL,
            session_id            TEXT    NOT NULL,
            customer_id           TEXT,
            status                TEXT    NOT NULL,
            outcome_mode          TEXT    NOT NULL,
            case_id               TEXT    NOT NULL,
            slots_json            TEXT    NOT NULL,
            issue                 TEXT,
            urgency               TEXT    NOT NULL,
            channel               TEXT    NOT NULL,
            call_sid              TEXT,
            caller_phone          TEXT,
            calendar_event_id     TEXT,
            calendar_event_start  TEXT,
            calendar_event_end    TEXT,
            final_script_used     TEXT,
            created_at            TEXT    NOT NULL,
            completed_at          TEXT
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_booking_requests_session_active
            ON booking_requests (session_id)
            WHERE status != 'cancelled';
        CREATE INDEX IF NOT EXISTS idx_booking_requests_company
            ON booking_requests (company_id);",
    )?;
    Ok(())
}
