use std::sync::Mutex;

use async_trait::async_trait;
use receptionist_core::{Channel, CompanyId};
use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::error::{Result, SessionError};
use crate::types::{Session, SessionKey, Turn, TurnRole};

/// spec.md §6.2 Session Store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for `key`, or create and persist a fresh one.
    /// `force_new` is the test-console escape hatch (spec.md §6.1
    /// `forceNewSession`) that always starts a clean session even if one
    /// already exists for this key.
    async fn get_or_create(&self, key: &SessionKey, force_new: bool) -> Result<Session>;

    async fn get(&self, key: &SessionKey) -> Result<Option<Session>>;

    /// Append a turn and persist it immediately — turns are an append-only
    /// log, distinct from the single end-of-turn `save` of the rest of the
    /// session state (spec.md §5 "all writes go through a single save at
    /// end of turn").
    async fn add_turn(&self, session: &mut Session, turn: Turn) -> Result<()>;

    /// Persist the full session, checked against `session.version`
    /// (optimistic concurrency, spec.md §5). On success `session.version`
    /// is bumped. Returns [`SessionError::VersionConflict`] if another
    /// writer committed first.
    async fn save(&self, session: &mut Session) -> Result<()>;
}

pub struct SqliteSessionStore {
    db: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    fn create_new(&self, key: &SessionKey) -> Result<Session> {
        let session = Session::new(key.clone());
        let state_json = serde_json::to_string(&session)?;
        let db = self.db.lock().expect("sessions db mutex poisoned");
        db.execute(
            "INSERT OR REPLACE INTO sessions
             (id, session_key, company_id, channel, identifier, mode, version, state_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            rusqlite::params![
                session.id.as_str(),
                key.format(),
                key.company_id.as_str(),
                key.channel.as_str(),
                key.identifier,
                "DISCOVERY",
                session.version,
                state_json,
                session.created_at,
            ],
        )?;
        Ok(session)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self), fields(key = %key, force_new))]
    async fn get_or_create(&self, key: &SessionKey, force_new: bool) -> Result<Session> {
        if force_new {
            debug!("forceNewSession requested, starting a clean session");
            return self.create_new(key);
        }
        if let Some(session) = self.get(key).await? {
            debug!("session cache hit");
            return Ok(session);
        }
        self.create_new(key)
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &SessionKey) -> Result<Option<Session>> {
        let key_str = key.format();
        let db = self.db.lock().expect("sessions db mutex poisoned");
        let state_json: std::result::Result<String, rusqlite::Error> = db.query_row(
            "SELECT state_json FROM sessions WHERE session_key = ?1",
            rusqlite::params![key_str],
            |row| row.get(0),
        );
        match state_json {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SessionError::Database(e)),
        }
    }

    #[instrument(skip(self, session, turn), fields(key = %session.key))]
    async fn add_turn(&self, session: &mut Session, turn: Turn) -> Result<()> {
        let is_user = matches!(turn.role, TurnRole::User);
        session.turns.push(turn);
        session.metrics.total_turns += 1;
        if is_user {
            // Silence is recorded as an empty-text user turn by the caller;
            // count it here so metrics stay in sync with the append.
            if session.turns.last().map(|t| t.text.trim().is_empty()).unwrap_or(false) {
                session.metrics.silence_count += 1;
            }
        }
        self.save(session).await
    }

    #[instrument(skip(self, session), fields(key = %session.key, version = session.version))]
    async fn save(&self, session: &mut Session) -> Result<()> {
        session.updated_at = chrono::Utc::now().to_rfc3339();
        let expected_version = session.version;
        let next_version = expected_version + 1;
        let mode_str = format!("{:?}", session.mode).to_uppercase();
        // Serialize with the bumped version already in place so the stored
        // JSON document and the scalar `version` column never disagree.
        session.version = next_version;
        let state_json = serde_json::to_string(&*session)?;

        let db = self.db.lock().expect("sessions db mutex poisoned");
        let rows_changed = db.execute(
            "UPDATE sessions
             SET mode = ?1, version = ?2, state_json = ?3, updated_at = ?4
             WHERE session_key = ?5 AND version = ?6",
            rusqlite::params![
                mode_str,
                next_version,
                state_json,
                session.updated_at,
                session.key.format(),
                expected_version,
            ],
        )?;
        if rows_changed == 0 {
            // Roll back the in-memory bump — the write didn't happen.
            session.version = expected_version;
            return Err(SessionError::VersionConflict {
                key: session.key.format(),
            });
        }
        Ok(())
    }
}

impl SqliteSessionStore {
    /// Admin/debug helper: list a tenant's session identifiers on a channel
    /// without deserializing each row's full state blob.
    pub fn list_identifiers(&self, company_id: &CompanyId, channel: Channel) -> Result<Vec<String>> {
        let db = self.db.lock().expect("sessions db mutex poisoned");
        let mut stmt = db.prepare(
            "SELECT identifier FROM sessions WHERE company_id = ?1 AND channel = ?2 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![company_id.as_str(), channel.as_str()],
            |row| row.get(0),
        )?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::CompanyId;

    fn open_store() -> SqliteSessionStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        SqliteSessionStore::new(conn)
    }

    fn key() -> SessionKey {
        SessionKey::new(CompanyId::from("acme"), Channel::Voice, "CA1")
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = open_store();
        let first = store.get_or_create(&key(), false).await.unwrap();
        let second = store.get_or_create(&key(), false).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn force_new_replaces_existing_session() {
        let store = open_store();
        let first = store.get_or_create(&key(), false).await.unwrap();
        let fresh = store.get_or_create(&key(), true).await.unwrap();
        assert_ne!(first.id, fresh.id);
    }

    #[tokio::test]
    async fn save_bumps_version_and_conflicts_on_stale_write() {
        let store = open_store();
        let mut session = store.get_or_create(&key(), false).await.unwrap();
        store.save(&mut session).await.unwrap();
        assert_eq!(session.version, 1);

        // A stale copy with the old version should be rejected.
        let mut stale = store.get(&key()).await.unwrap().unwrap();
        stale.version = 0;
        let result = store.save(&mut stale).await;
        assert!(matches!(result, Err(SessionError::VersionConflict { .. })));
    }
}
