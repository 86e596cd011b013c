use thiserror::Error;

/// Errors that can occur within any channel adapter (spec.md §6.1 — each
/// channel is a narrow, external collaborator; the core only needs to know
/// that delivery or signature verification can fail).
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("webhook signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("malformed inbound payload: {0}")]
    MalformedPayload(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
