use thiserror::Error;

/// Shared error taxonomy (spec.md §7). Individual crates define their own
/// richer error enums where they own a resource (session store, booking
/// store, audit store); this one covers the config/validation concerns every
/// crate touches.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing tenant prompt at config path '{path}', using safe default")]
    MissingTenantPrompt { path: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("urgency value '{0}' is not a recognized enum member")]
    InvalidUrgency(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
