use std::collections::HashMap;

use receptionist_core::{CompanyId, SessionId, Urgency};
use serde::{Deserialize, Serialize};

/// Persisted outcome of a finalized booking (spec.md §3 `BookingRequest`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: String,
    pub company_id: CompanyId,
    pub session_id: SessionId,
    pub customer_id: Option<String>,
    pub status: BookingStatus,
    pub outcome_mode: String,
    pub case_id: String,
    #[serde(default)]
    pub slots: HashMap<String, String>,
    pub issue: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub channel: String,
    pub call_sid: Option<String>,
    pub caller_phone: Option<String>,
    pub calendar_event_id: Option<String>,
    pub calendar_event_start: Option<String>,
    pub calendar_event_end: Option<String>,
    pub final_script_used: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// spec.md §3 `BookingRequest.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    FakeConfirmed,
    PendingDispatch,
    CallbackQueued,
    Transferred,
    AfterHours,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::FakeConfirmed => "fake_confirmed",
            BookingStatus::PendingDispatch => "pending_dispatch",
            BookingStatus::CallbackQueued => "callback_queued",
            BookingStatus::Transferred => "transferred",
            BookingStatus::AfterHours => "after_hours",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "fake_confirmed" => BookingStatus::FakeConfirmed,
            "pending_dispatch" => BookingStatus::PendingDispatch,
            "callback_queued" => BookingStatus::CallbackQueued,
            "transferred" => BookingStatus::Transferred,
            "after_hours" => BookingStatus::AfterHours,
            "cancelled" => BookingStatus::Cancelled,
            _ => return None,
        })
    }
}

/// Outcome of running one sub-flow against the current turn's input (spec.md
/// §4.6, one controller cascade step per slot). Mirrors the tagged-union
/// shape used for `ScenarioReply` in `receptionist-scenarios` — a plain
/// `Option<String>` would lose the distinction between "say this and keep
/// going" and "say this and stop the turn here".
#[derive(Debug, Clone, PartialEq)]
pub enum SubFlowResult {
    /// Emit `text` as the turn's reply and stop the booking cascade here.
    Reply(String),
    /// This sub-flow has nothing to say; move on to the next slot.
    Continue,
    /// Emit `text`, then mark the turn as requiring a transfer (loop
    /// exhaustion, tenant escalation trigger, or abort-by-silence).
    EscalateTransfer(String),
    /// The caller aborted the booking (spec.md §4.6.9); emit `text` and
    /// transition the session to COMPLETE with a `message_taken` outcome.
    Abort(String),
}

impl SubFlowResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubFlowResult::Continue)
    }
}
