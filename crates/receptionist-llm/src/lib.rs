pub mod client;
pub mod types;

pub use client::{FallbackLlmClient, LlmClient, LlmError};
pub use types::{CallContext, ConversationRole, ConversationTurn, LlmRequest, LlmResponse, LlmSignals};
