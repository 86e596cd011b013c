use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("call not found: {0}")]
    CallNotFound(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;
