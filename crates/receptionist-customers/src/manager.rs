use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::row_to_customer;
use crate::error::Result;
use crate::types::Customer;

/// Thread-safe phone-keyed customer directory, one row per `(company_id,
/// phone)`. A single SQLite connection behind a `Mutex`, `instrument`ed public
/// methods, upsert via read-then-write rather than `ON CONFLICT` so the
/// merge logic (don't overwrite a known name with a blank one) stays in
/// Rust where it's easy to read.
pub struct CustomerManager {
    db: Mutex<Connection>,
}

impl CustomerManager {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    #[instrument(skip(self), fields(company_id, phone))]
    pub fn find_by_phone(&self, company_id: &str, phone: &str) -> Result<Option<Customer>> {
        let db = self.db.lock().expect("customers db mutex poisoned");
        match db.query_row(
            "SELECT id, company_id, phone, name, email, service_address, notes,
                    total_bookings, last_booking_at, created_at, updated_at
             FROM customers WHERE company_id = ?1 AND phone = ?2",
            rusqlite::params![company_id, phone],
            row_to_customer,
        ) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the directory entry on first contact, or merge in newly
    /// learned fields (name/email/address) without blanking ones already
    /// on file — a caller who doesn't repeat their email this call
    /// shouldn't lose it.
    #[instrument(skip(self, name, email, service_address), fields(company_id, phone))]
    pub fn upsert(
        &self,
        company_id: &str,
        phone: &str,
        name: Option<&str>,
        email: Option<&str>,
        service_address: Option<&str>,
    ) -> Result<Customer> {
        if let Some(existing) = self.find_by_phone(company_id, phone)? {
            let merged_name = name.map(String::from).or(existing.name.clone());
            let merged_email = email.map(String::from).or(existing.email.clone());
            let merged_address = service_address.map(String::from).or(existing.service_address.clone());
            if merged_name == existing.name && merged_email == existing.email && merged_address == existing.service_address {
                debug!("no new fields to merge, skipping write");
                return Ok(existing);
            }
            let now = chrono::Utc::now().to_rfc3339();
            let db = self.db.lock().expect("customers db mutex poisoned");
            db.execute(
                "UPDATE customers SET name = ?1, email = ?2, service_address = ?3, updated_at = ?4
                 WHERE id = ?5",
                rusqlite::params![merged_name, merged_email, merged_address, now, existing.id],
            )?;
            return Ok(Customer {
                name: merged_name,
                email: merged_email,
                service_address: merged_address,
                updated_at: now,
                ..existing
            });
        }

        let id = Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().expect("customers db mutex poisoned");
        db.execute(
            "INSERT INTO customers (id, company_id, phone, name, email, service_address, notes,
                                     total_bookings, last_booking_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, NULL, ?7, ?7)",
            rusqlite::params![id, company_id, phone, name, email, service_address, now],
        )?;
        Ok(Customer {
            id,
            company_id: company_id.to_string(),
            phone: phone.to_string(),
            name: name.map(String::from),
            email: email.map(String::from),
            service_address: service_address.map(String::from),
            notes: None,
            total_bookings: 0,
            last_booking_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Bump booking stats after a successful finalization (spec.md §4.7).
    #[instrument(skip(self), fields(company_id, phone))]
    pub fn record_booking(&self, company_id: &str, phone: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().expect("customers db mutex poisoned");
        db.execute(
            "UPDATE customers SET total_bookings = total_bookings + 1, last_booking_at = ?1, updated_at = ?1
             WHERE company_id = ?2 AND phone = ?3",
            rusqlite::params![now, company_id, phone],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> CustomerManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        CustomerManager::new(conn)
    }

    #[test]
    fn upsert_creates_then_merges_without_blanking() {
        let mgr = manager();
        mgr.upsert("acme", "2395550199", Some("Mark"), None, None).unwrap();
        let merged = mgr.upsert("acme", "2395550199", None, Some("mark@example.com"), None).unwrap();
        assert_eq!(merged.name.as_deref(), Some("Mark"));
        assert_eq!(merged.email.as_deref(), Some("mark@example.com"));
    }

    #[test]
    fn record_booking_increments_counter() {
        let mgr = manager();
        mgr.upsert("acme", "2395550199", Some("Mark"), None, None).unwrap();
        mgr.record_booking("acme", "2395550199").unwrap();
        let customer = mgr.find_by_phone("acme", "2395550199").unwrap().unwrap();
        assert_eq!(customer.total_bookings, 1);
        assert!(customer.last_booking_at.is_some());
    }

    #[test]
    fn separate_tenants_do_not_share_customers() {
        let mgr = manager();
        mgr.upsert("acme", "2395550199", Some("Mark"), None, None).unwrap();
        assert!(mgr.find_by_phone("other-co", "2395550199").unwrap().is_none());
    }
}
