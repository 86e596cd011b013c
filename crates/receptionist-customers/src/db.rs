use rusqlite::Connection;

use crate::error::Result;

/// `UNIQUE(company_id, phone)` is the hot-path lookup — one customer per
/// phone number per tenant.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS customers (
            id               TEXT PRIMARY KEY NOT NULL,
            company_id       TEXT NOT NULL,
            phone            TEXT NOT NULL,
            name             TEXT,
            email            TEXT,
            service_address  TEXT,
            notes            TEXT,
            total_bookings   INTEGER NOT NULL DEFAULT 0,
            last_booking_at  TEXT,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL,
            UNIQUE(company_id, phone)
        );
        CREATE INDEX IF NOT EXISTS idx_customers_lookup
            ON customers (company_id, phone);",
    )?;
    Ok(())
}

pub(crate) fn row_to_customer(row: &rusqlite::Row<'_>) -> rusqlite::Result<crate::types::Customer> {
    Ok(crate::types::Customer {
        id: row.get(0)?,
        company_id: row.get(1)?,
        phone: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        service_address: row.get(5)?,
        notes: row.get(6)?,
        total_bookings: row.get::<_, i64>(7)? as u32,
        last_booking_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
