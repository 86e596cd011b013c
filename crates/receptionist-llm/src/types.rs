use std::collections::HashMap;

use receptionist_core::{AgentIntent, Mode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: ConversationRole,
    pub text: String,
}

/// Channel/call context threaded through to the LLM so prompts can
/// reference it (spec.md §6.4 `callContext`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallContext {
    pub company_id: String,
    pub channel: String,
    pub call_sid: Option<String>,
}

/// Request to the LLM fallback (spec.md §6.4 `processConversation`).
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub company_name: String,
    pub trade: String,
    pub call_context: CallContext,
    pub current_mode: Mode,
    pub known_slots: HashMap<String, String>,
    pub conversation_history: Vec<ConversationTurn>,
    pub user_input: String,
    /// Free-form behavior hints surfaced from tenant config (escalation
    /// phrases, booking-interruption mode, etc.) — rendered into the
    /// system prompt rather than structurally parsed.
    pub behavior_config: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSignals {
    pub defer_to_booking_runner: bool,
    pub scheduling_accepted: bool,
    pub requires_transfer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub reply: String,
    pub tokens_used: u64,
    pub intent: Option<AgentIntent>,
    pub next_goal: Option<String>,
    pub extracted_issue: Option<String>,
    #[serde(default)]
    pub signals: LlmSignals,
}
