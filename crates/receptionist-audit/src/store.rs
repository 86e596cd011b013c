//! Audit Store (spec.md §6.8): `ensureCall`, `addTranscript`, `addEvent`,
//! `logEvent`. The turn orchestrator's audit write is the one non-negotiable
//! synchronous side effect (spec.md §5) — every other store write in this
//! crate may be fire-and-forget from the orchestrator's point of view, but
//! the trait itself is always awaited directly; callers choose whether to
//! block on it.

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::types::{AuditRecord, CallEvent, TranscriptEntry};

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn ensure_call(
        &self,
        call_id: &str,
        company_id: &str,
        from: Option<&str>,
        to: Option<&str>,
        source: Option<&str>,
        session_snapshot: Option<&Value>,
    ) -> Result<()>;

    async fn add_transcript(&self, entry: TranscriptEntry) -> Result<()>;

    async fn add_event(&self, event: CallEvent) -> Result<()>;

    /// Append one full turn audit record. This is the "Black Box" write
    /// (spec.md §4.10) — it must never panic the caller on failure; callers
    /// are expected to log the returned error and continue.
    async fn log_event(&self, record: AuditRecord) -> Result<()>;
}

pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    #[instrument(skip(self, session_snapshot), fields(call_id))]
    async fn ensure_call(
        &self,
        call_id: &str,
        company_id: &str,
        from: Option<&str>,
        to: Option<&str>,
        source: Option<&str>,
        session_snapshot: Option<&Value>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let exists: Option<String> = conn
            .query_row(
                "SELECT call_id FROM audit_calls WHERE call_id = ?1",
                params![call_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Ok(());
        }
        let snapshot = session_snapshot.map(|v| v.to_string());
        conn.execute(
            "INSERT INTO audit_calls (call_id, company_id, from_addr, to_addr, source, session_snapshot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                call_id,
                company_id,
                from,
                to,
                source,
                snapshot,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self, entry), fields(call_id = %entry.call_id, turn = entry.turn))]
    async fn add_transcript(&self, entry: TranscriptEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO audit_transcripts (call_id, company_id, speaker, turn, text, confidence, source, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.call_id,
                entry.company_id,
                entry.speaker,
                entry.turn,
                entry.text,
                entry.confidence,
                entry.source,
                entry.timestamp
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self, event), fields(call_id = %event.call_id, event_type = %event.event_type))]
    async fn add_event(&self, event: CallEvent) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO audit_events (call_id, event_type, data, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![event.call_id, event.event_type, event.data.to_string(), event.timestamp],
        )?;
        Ok(())
    }

    #[instrument(skip(self, record), fields(call_id = %record.call_id, turn = record.turn_number))]
    async fn log_event(&self, record: AuditRecord) -> Result<()> {
        let serialized = serde_json::to_string(&record)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO audit_turns (call_id, company_id, channel, session_id, turn_number, turn_trace_id, record, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.call_id,
                record.company_id,
                record.channel,
                record.session_id,
                record.turn_number,
                record.turn_trace_id,
                serialized,
                record.timestamp
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComplianceResult, DiscoverySnapshot, ResponseAttribution};
    use receptionist_core::Mode;

    fn sample_record(call_id: &str, turn: u32) -> AuditRecord {
        AuditRecord {
            call_id: call_id.to_string(),
            company_id: "acme".to_string(),
            channel: "voice".to_string(),
            session_id: "sess-1".to_string(),
            turn_number: turn,
            turn_trace_id: "trace-1".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            mode: Mode::Discovery,
            previous_mode: Mode::Discovery,
            mode_transition: false,
            phase: "discovery".to_string(),
            consent_detected: false,
            consent_phrase: None,
            consent_given: false,
            booking_started: false,
            consent_pending_turn: false,
            response: ResponseAttribution::default(),
            matching: None,
            execution_flags: vec!["reply_generated".to_string()],
            compliance: ComplianceResult { passed: true, ..Default::default() },
            discovery: DiscoverySnapshot::default(),
        }
    }

    #[tokio::test]
    async fn ensure_call_is_idempotent() {
        let store = SqliteAuditStore::new(Connection::open_in_memory().unwrap()).unwrap();
        store.ensure_call("call-1", "acme", Some("+15551234567"), None, Some("voice"), None).await.unwrap();
        store.ensure_call("call-1", "acme", Some("+15551234567"), None, Some("voice"), None).await.unwrap();
        let conn = store.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_calls", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn log_event_appends_a_row_per_turn() {
        let store = SqliteAuditStore::new(Connection::open_in_memory().unwrap()).unwrap();
        store.log_event(sample_record("call-1", 1)).await.unwrap();
        store.log_event(sample_record("call-1", 2)).await.unwrap();
        let conn = store.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_turns WHERE call_id = 'call-1'", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn add_transcript_and_event_persist() {
        let store = SqliteAuditStore::new(Connection::open_in_memory().unwrap()).unwrap();
        store
            .add_transcript(TranscriptEntry {
                call_id: "call-1".to_string(),
                company_id: "acme".to_string(),
                speaker: "user".to_string(),
                turn: 1,
                text: "I need service".to_string(),
                confidence: Some(0.9),
                source: Some("stt".to_string()),
                timestamp: chrono::Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();
        store
            .add_event(CallEvent {
                call_id: "call-1".to_string(),
                event_type: "booking_finalized".to_string(),
                data: serde_json::json!({"caseId": "CASE-1"}),
                timestamp: chrono::Utc::now().to_rfc3339(),
            })
            .await
            .unwrap();
        let conn = store.conn.lock().unwrap();
        let transcripts: i64 = conn.query_row("SELECT COUNT(*) FROM audit_transcripts", [], |r| r.get(0)).unwrap();
        let events: i64 = conn.query_row("SELECT COUNT(*) FROM audit_events", [], |r| r.get(0)).unwrap();
        assert_eq!(transcripts, 1);
        assert_eq!(events, 1);
    }
}
