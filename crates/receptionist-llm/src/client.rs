use async_trait::async_trait;
use thiserror::Error;

use crate::types::{LlmRequest, LlmResponse, LlmSignals};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM call timed out")]
    Timeout,

    #[error("LLM provider returned an error: {0}")]
    Provider(String),
}

/// spec.md §6.4 LLM Client. "The LLM is consulted as a last resort in
/// DISCOVERY and for booking interruptions. It must never be called for
/// Tier-1 intercepts or scenario short-circuits" — enforced by the
/// orchestrator's call sites, not by this trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn process_conversation(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}

/// A stub client that never actually calls out to a model provider — the
/// real LLM integration is out of scope. Keeps an `http` client around for
/// providers that mostly return canned/local responses today but will make
/// real calls once wired up.
pub struct FallbackLlmClient {
    #[allow(dead_code)]
    http: reqwest::Client,
    fallback_reply: String,
}

impl FallbackLlmClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            fallback_reply: "Let me get that for you — one moment.".to_string(),
        }
    }

    pub fn with_fallback_reply(fallback_reply: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            fallback_reply: fallback_reply.into(),
        }
    }
}

impl Default for FallbackLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for FallbackLlmClient {
    async fn process_conversation(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            reply: self.fallback_reply.clone(),
            tokens_used: 0,
            intent: None,
            next_goal: None,
            extracted_issue: None,
            signals: LlmSignals::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallContext, ConversationTurn};
    use receptionist_core::Mode;
    use std::collections::HashMap;

    #[tokio::test]
    async fn fallback_client_never_panics_and_returns_canned_reply() {
        let client = FallbackLlmClient::new();
        let request = LlmRequest {
            company_name: "Acme HVAC".into(),
            trade: "hvac".into(),
            call_context: CallContext {
                company_id: "acme".into(),
                channel: "voice".into(),
                call_sid: None,
            },
            current_mode: Mode::Discovery,
            known_slots: HashMap::new(),
            conversation_history: vec![ConversationTurn {
                role: crate::types::ConversationRole::User,
                text: "my ac is broken".into(),
            }],
            user_input: "my ac is broken".into(),
            behavior_config: HashMap::new(),
        };
        let response = client.process_conversation(&request).await.unwrap();
        assert_eq!(response.tokens_used, 0);
        assert!(!response.reply.is_empty());
    }
}
