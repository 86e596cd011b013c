use std::sync::Mutex;

use async_trait::async_trait;
use receptionist_core::{CompanyId, SessionId, Urgency};
use rusqlite::{Connection, OptionalExtension};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::{BookingError, Result};
use crate::types::{BookingRequest, BookingStatus};

/// spec.md §6.5 Booking Store.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<BookingRequest>>;

    /// Insert `booking`, enforcing the unique-session index (spec.md §3
    /// idempotency). If a non-cancelled record for the same session already
    /// exists, the loser returns the winner unchanged rather than erroring —
    /// callers never see a constraint-violation error from this method.
    async fn insert(&self, booking: BookingRequest) -> Result<BookingRequest>;

    async fn update_calendar_fields(
        &self,
        booking_id: &str,
        event_id: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<()>;
}

pub struct SqliteBookingStore {
    db: Mutex<Connection>,
}

impl SqliteBookingStore {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }
}

fn row_to_booking(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingRequest> {
    let status_str: String = row.get("status")?;
    let urgency_str: String = row.get("urgency")?;
    let slots_json: String = row.get("slots_json")?;
    Ok(BookingRequest {
        id: row.get("id")?,
        company_id: CompanyId::from(row.get::<_, String>("company_id")?),
        session_id: SessionId::from(row.get::<_, String>("session_id")?),
        customer_id: row.get("customer_id")?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::PendingDispatch),
        outcome_mode: row.get("outcome_mode")?,
        case_id: row.get("case_id")?,
        slots: serde_json::from_str(&slots_json).unwrap_or_default(),
        issue: row.get("issue")?,
        urgency: Urgency::parse(&urgency_str).unwrap_or_default(),
        channel: row.get("channel")?,
        call_sid: row.get("call_sid")?,
        caller_phone: row.get("caller_phone")?,
        calendar_event_id: row.get("calendar_event_id")?,
        calendar_event_start: row.get("calendar_event_start")?,
        calendar_event_end: row.get("calendar_event_end")?,
        final_script_used: row.get("final_script_used")?,
        created_at: row.get("created_at")?,
        completed_at: row.get("completed_at")?,
    })
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn find_by_session(&self, session_id: &SessionId) -> Result<Option<BookingRequest>> {
        let db = self.db.lock().expect("booking db mutex poisoned");
        db.query_row(
            "SELECT * FROM booking_requests WHERE session_id = ?1 AND status != 'cancelled'",
            [session_id.as_str()],
            row_to_booking,
        )
        .optional()
        .map_err(BookingError::Database)
    }

    #[instrument(skip(self, booking), fields(session_id = %booking.session_id))]
    async fn insert(&self, mut booking: BookingRequest) -> Result<BookingRequest> {
        if booking.id.is_empty() {
            booking.id = Uuid::now_v7().to_string();
        }
        let slots_json = serde_json::to_string(&booking.slots)?;

        let db = self.db.lock().expect("booking db mutex poisoned");
        let insert_result = db.execute(
            "INSERT INTO booking_requests
             (id, company_id, session_id, customer_id, status, outcome_mode, case_id,
              slots_json, issue, urgency, channel, call_sid, caller_phone,
              calendar_event_id, calendar_event_start, calendar_event_end,
              final_script_used, created_at, completed_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
            rusqlite::params![
                booking.id,
                booking.company_id.as_str(),
                booking.session_id.as_str(),
                booking.customer_id,
                booking.status.as_str(),
                booking.outcome_mode,
                booking.case_id,
                slots_json,
                booking.issue,
                booking.urgency.as_str(),
                booking.channel,
                booking.call_sid,
                booking.caller_phone,
                booking.calendar_event_id,
                booking.calendar_event_start,
                booking.calendar_event_end,
                booking.final_script_used,
                booking.created_at,
                booking.completed_at,
            ],
        );

        match insert_result {
            Ok(_) => Ok(booking),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                // Lost the race (or this is a legitimate retry): someone else's
                // record already won the unique-session index. Fetch and
                // return it instead of erroring (spec.md §4.7 idempotency).
                warn!(session_id = %booking.session_id, "booking insert lost unique-session race, refetching winner");
                db.query_row(
                    "SELECT * FROM booking_requests WHERE session_id = ?1 AND status != 'cancelled'",
                    [booking.session_id.as_str()],
                    row_to_booking,
                )
                .map_err(BookingError::Database)
            }
            Err(e) => Err(BookingError::Database(e)),
        }
    }

    #[instrument(skip(self))]
    async fn update_calendar_fields(
        &self,
        booking_id: &str,
        event_id: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<()> {
        let db = self.db.lock().expect("booking db mutex poisoned");
        db.execute(
            "UPDATE booking_requests
             SET calendar_event_id = ?1, calendar_event_start = ?2, calendar_event_end = ?3
             WHERE id = ?4",
            rusqlite::params![event_id, start, end, booking_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> SqliteBookingStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        SqliteBookingStore::new(conn)
    }

    fn sample(session_id: SessionId) -> BookingRequest {
        BookingRequest {
            id: String::new(),
            company_id: CompanyId::from("acme"),
            session_id,
            customer_id: None,
            status: BookingStatus::PendingDispatch,
            outcome_mode: "pending_dispatch".into(),
            case_id: "CASE-1".into(),
            slots: Default::default(),
            issue: Some("no cooling".into()),
            urgency: Urgency::Urgent,
            channel: "voice".into(),
            call_sid: None,
            caller_phone: Some("2395551234".into()),
            calendar_event_id: None,
            calendar_event_start: None,
            calendar_event_end: None,
            final_script_used: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = open_store();
        let sid = SessionId::new();
        let inserted = store.insert(sample(sid.clone())).await.unwrap();
        let found = store.find_by_session(&sid).await.unwrap().unwrap();
        assert_eq!(found.id, inserted.id);
        assert_eq!(found.case_id, "CASE-1");
    }

    #[tokio::test]
    async fn duplicate_insert_for_same_session_returns_the_winner() {
        let store = open_store();
        let sid = SessionId::new();
        let first = store.insert(sample(sid.clone())).await.unwrap();

        let mut second = sample(sid.clone());
        second.case_id = "CASE-2".into();
        let returned = store.insert(second).await.unwrap();

        // Both calls must resolve to exactly one record: the first winner.
        assert_eq!(returned.id, first.id);
        assert_eq!(returned.case_id, "CASE-1");
    }

    #[tokio::test]
    async fn find_by_session_ignores_cancelled_records() {
        let store = open_store();
        let sid = SessionId::new();
        let mut cancelled = sample(sid.clone());
        cancelled.status = BookingStatus::Cancelled;
        store.insert(cancelled).await.unwrap();

        assert!(store.find_by_session(&sid).await.unwrap().is_none());

        // A fresh attempt after cancellation must succeed (the partial
        // unique index excludes cancelled rows).
        let fresh = store.insert(sample(sid.clone())).await.unwrap();
        assert_eq!(fresh.case_id, "CASE-1");
    }
}
