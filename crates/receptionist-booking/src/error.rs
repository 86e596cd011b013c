use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("booking request not found: {id}")]
    NotFound { id: String },
}

pub type Result<T> = std::result::Result<T, BookingError>;
