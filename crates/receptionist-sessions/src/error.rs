use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {key}")]
    NotFound { key: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid session key: {0}")]
    InvalidKey(String),

    /// The optimistic-concurrency version column didn't match on save —
    /// another turn for this session committed first. The caller should
    /// reload and retry the whole turn once (spec.md §5).
    #[error("session version conflict for {key}, retry turn")]
    VersionConflict { key: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
