use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("customer not found: company={company_id} phone={phone}")]
    NotFound { company_id: String, phone: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CustomerError>;
