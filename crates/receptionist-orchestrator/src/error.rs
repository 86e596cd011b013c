use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("session error: {0}")]
    Session(#[from] receptionist_sessions::SessionError),

    #[error("booking error: {0}")]
    Booking(#[from] receptionist_booking::BookingError),

    #[error("audit error: {0}")]
    Audit(#[from] receptionist_audit::AuditError),

    #[error("scenario retrieval error: {0}")]
    Scenario(#[from] receptionist_scenarios::ScenarioError),

    #[error("llm error: {0}")]
    Llm(#[from] receptionist_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
