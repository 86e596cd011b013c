use serde::{Deserialize, Serialize};

/// A caller utterance received from an external channel (voice, SMS,
/// website, or the internal test console), normalized into the shape
/// `receptionist-orchestrator::TurnRequest` expects (spec.md §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Logical channel name (`voice`, `sms`, `website`, `test`).
    pub channel: String,

    /// Channel-identifier (spec.md §3 Session): call-SID for voice, phone
    /// number for SMS, a generated token for web/test.
    pub identifier: String,

    /// Raw caller utterance. May be empty — the silence intercept handles
    /// that case (spec.md §4.4 #1).
    pub text: String,

    /// Inbound caller ID, when the channel exposes one (spec.md §4.6.2
    /// "offer caller ID").
    pub caller_id: Option<String>,

    /// Telephony call-SID, when present.
    pub call_sid: Option<String>,

    /// ISO-8601 arrival timestamp.
    pub received_at: String,

    /// Slots the channel adapter already parsed out-of-band (spec.md §6.1
    /// `preExtractedSlots`), e.g. DTMF-collected digits.
    #[serde(default)]
    pub pre_extracted_slots: std::collections::HashMap<String, String>,

    /// Test-console escape hatch (spec.md §6.1 `forceNewSession`).
    #[serde(default)]
    pub force_new_session: bool,
}

/// The agent's reply, ready for a channel adapter to deliver back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub channel: String,
    pub identifier: String,
    pub text: String,
    pub requires_transfer: bool,
}

/// Runtime connection state of a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}
