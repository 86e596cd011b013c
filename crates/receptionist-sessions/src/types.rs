use std::collections::HashMap;

use receptionist_core::config::SlotType;
use receptionist_core::{AgentIntent, Channel, CompanyId, Mode, Phase, SessionId, Urgency};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// A session's composite lookup key (spec.md §3: "keyed by (companyId,
/// channel, channel-identifier)"). `identifier` is the call-SID for voice,
/// the caller's phone number for SMS, or a generated token for web/test.
///
/// A colon-delimited wire format so the same key both indexes the database
/// and doubles as a human-readable log field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub company_id: CompanyId,
    pub channel: Channel,
    pub identifier: String,
}

impl SessionKey {
    pub fn new(company_id: CompanyId, channel: Channel, identifier: impl Into<String>) -> Self {
        Self {
            company_id,
            channel,
            identifier: identifier.into(),
        }
    }

    /// `company:{id}:channel:{channel}:{identifier}` — `identifier` may
    /// itself contain colons (web tokens sometimes do), so it is always the
    /// suffix and never parsed past the first match of `:channel:`.
    pub fn format(&self) -> String {
        format!(
            "company:{}:channel:{}:{}",
            self.company_id, self.channel, self.identifier
        )
    }

    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("company:")
            .ok_or_else(|| SessionError::InvalidKey(format!("missing 'company:' prefix: {s}")))?;

        let marker = ":channel:";
        let pos = rest
            .find(marker)
            .ok_or_else(|| SessionError::InvalidKey(format!("missing ':channel:' segment: {s}")))?;
        let company_id = &rest[..pos];
        let after = &rest[pos + marker.len()..];

        let colon = after
            .find(':')
            .ok_or_else(|| SessionError::InvalidKey(format!("missing identifier segment: {s}")))?;
        let channel_str = &after[..colon];
        let identifier = &after[colon + 1..];

        if company_id.is_empty() || identifier.is_empty() {
            return Err(SessionError::InvalidKey(format!(
                "key components must not be empty: {s}"
            )));
        }
        let channel = Channel::parse(channel_str)
            .ok_or_else(|| SessionError::InvalidKey(format!("unknown channel '{channel_str}': {s}")))?;

        Ok(Self {
            company_id: CompanyId::from(company_id),
            channel,
            identifier: identifier.to_string(),
        })
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// Which end of the name sub-flow a lone token was assumed to fill
/// (spec.md §4.1 "mark it as assumed-first; otherwise assumed-last").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTokenGuess {
    First,
    Last,
}

/// Per-call cooldown/budget bookkeeping for one mid-call rule (spec.md
/// §4.6.6), keyed by the rule's index within the owning slot's
/// `bookingSlots[].midCallRules[]`. Lives on the slot's own [`SlotMeta`] so
/// the budget and cooldown survive across turns instead of being
/// reconstructed fresh on every call into the booking cascade.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MidCallRuleState {
    pub fired_count: u32,
    pub last_fired_turn: Option<u32>,
}

/// Per-slot sub-flow state (spec.md §3 `booking.meta[slotId]`). The fields
/// used depend on the slot's type: name sub-flow fields for `SlotType::Name`,
/// the generic confirm/breakdown fields for everything else.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlotMeta {
    // --- name sub-flow ---
    pub first: Option<String>,
    pub last: Option<String>,
    pub last_confirmed: bool,
    pub asked_missing_part_once: bool,
    pub assumed_single_token_as: Option<NameTokenGuess>,
    pub asked_spelling_variant: bool,
    pub spelling_variant_answer: Option<String>,
    pub duplicate_confirm_pending: bool,
    pub missing_part_attempts: u32,

    // --- phone / address / time sub-flow ---
    pub pending_confirm: bool,
    pub confirmed: bool,
    pub confirm_silence_count: u32,
    pub breakdown_step: Option<String>,
    /// Loop-prevention counter (spec.md §4.6.5): how many times the
    /// *current* question (`last_asked_question`) has been asked back to
    /// back this call. Kept separate from `breakdown_step` so
    /// address/phone sub-state and ask-counting never collide.
    pub asked_count: u32,
    /// The exact prompt text `asked_count` is counting re-asks of. A
    /// sub-flow moving on to a genuinely different question for this slot
    /// (e.g. a name confirm prompt giving way to a missing-last-name
    /// prompt) resets the counter instead of inheriting it.
    pub last_asked_question: Option<String>,

    // --- address access sub-flow (spec.md §4.6.8) ---
    pub property_type: Option<String>,
    pub unit_number: Option<String>,
    pub gated: Option<bool>,
    pub gate_access_type: Option<String>,
    pub gate_code: Option<String>,
    pub guard_notified: bool,
    pub access_follow_ups_asked: u32,

    /// Mid-call rule cooldown/budget state for this slot, keyed by rule
    /// index (spec.md §4.6.6).
    #[serde(default)]
    pub mid_call_rules: HashMap<usize, MidCallRuleState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BookingState {
    pub consent_given: bool,
    pub consent_phrase: Option<String>,
    pub consent_turn: Option<u32>,
    pub consent_timestamp: Option<String>,
    pub active_slot: Option<String>,
    pub active_slot_type: Option<SlotType>,
    #[serde(default)]
    pub meta: HashMap<String, SlotMeta>,
    pub completed_at: Option<String>,
    pub booking_request_id: Option<String>,
    pub outcome_mode: Option<String>,
}

impl BookingState {
    pub fn meta_mut(&mut self, slot_id: &str) -> &mut SlotMeta {
        self.meta.entry(slot_id.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscoveryState {
    pub issue: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub tech_mentioned: bool,
    pub tenure: Option<String>,
    pub temperature: Option<String>,
    pub equipment: Option<String>,
    pub turn_count: u32,
    pub offered_scheduling: bool,
    pub asked_clarifying_question: bool,
}

/// Monotonic session locks (spec.md §3 `locks`): every field starts false
/// and, once set true, must never be reset for the life of the session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionLocks {
    pub greeted: bool,
    pub issue_captured: bool,
    pub booking_started: bool,
    pub booking_locked: bool,
    #[serde(default)]
    pub asked_slots: HashMap<String, bool>,
}

impl SessionLocks {
    /// Set a monotonic flag. Returns `false` (no-op) if it was already set,
    /// matching "once true never reset" (spec.md §3 invariants).
    pub fn set_once(flag: &mut bool) -> bool {
        if *flag {
            return false;
        }
        *flag = true;
        true
    }

    pub fn mark_asked(&mut self, slot_id: &str) {
        self.asked_slots.insert(slot_id.to_string(), true);
    }

    pub fn was_asked(&self, slot_id: &str) -> bool {
        self.asked_slots.get(slot_id).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionMemory {
    pub rolling_summary: Option<String>,
    #[serde(default)]
    pub facts: HashMap<String, String>,
    #[serde(default)]
    pub acknowledged_claims: Vec<String>,
    pub last_user_intent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: String,
    #[serde(default)]
    pub tokens_used: u64,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionMetrics {
    pub total_turns: u32,
    pub silence_count: u32,
}

/// A persisted conversation session (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub key: SessionKey,
    pub mode: Mode,
    pub phase: Phase,
    #[serde(default)]
    pub collected_slots: HashMap<String, String>,
    #[serde(default)]
    pub booking: BookingState,
    #[serde(default)]
    pub discovery: DiscoveryState,
    #[serde(default)]
    pub locks: SessionLocks,
    #[serde(default)]
    pub memory: SessionMemory,
    #[serde(default)]
    pub turns: Vec<Turn>,
    pub last_agent_intent: Option<AgentIntent>,
    #[serde(default)]
    pub metrics: SessionMetrics,
    #[serde(default)]
    pub flags: HashMap<String, bool>,
    /// Optimistic-concurrency token (spec.md §5); bumped on every save.
    #[serde(default)]
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: SessionId::new(),
            key,
            mode: Mode::Discovery,
            phase: Phase::Greeting,
            collected_slots: HashMap::new(),
            booking: BookingState::default(),
            discovery: DiscoveryState::default(),
            locks: SessionLocks::default(),
            memory: SessionMemory::default(),
            turns: Vec::new(),
            last_agent_intent: None,
            metrics: SessionMetrics::default(),
            flags: HashMap::new(),
            version: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Attempt a mode transition, enforcing spec.md testable property 3.
    /// `explicit_new_booking` is true iff the caller just said a configured
    /// "new booking" keyword while in COMPLETE mode.
    pub fn try_set_mode(&mut self, next: Mode, explicit_new_booking: bool) -> bool {
        if !self.mode.can_transition_to(next, explicit_new_booking) {
            return false;
        }
        self.mode = next;
        self.phase = Phase::from(next);
        true
    }

    pub fn push_turn(&mut self, role: TurnRole, text: impl Into<String>, tokens_used: u64, source: Option<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            tokens_used,
            source,
        });
        self.metrics.total_turns += 1;
    }

    pub fn slot_is_locked(&self, slot_id: &str) -> bool {
        self.collected_slots.contains_key(slot_id)
            && self
                .booking
                .meta
                .get(slot_id)
                .map(|m| m.confirmed || m.last_confirmed)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_simple_key() {
        let key = SessionKey::new(CompanyId::from("acme"), Channel::Voice, "CA1234");
        let s = key.format();
        assert_eq!(s, "company:acme:channel:voice:CA1234");
        let parsed = SessionKey::parse(&s).expect("parse failed");
        assert_eq!(parsed, key);
    }

    #[test]
    fn roundtrip_identifier_with_colons() {
        let key = SessionKey::new(CompanyId::from("acme"), Channel::Website, "tok:abc:123");
        let s = key.format();
        let parsed = SessionKey::parse(&s).expect("parse failed");
        assert_eq!(parsed.identifier, "tok:abc:123");
    }

    #[test]
    fn parse_missing_channel_segment_returns_err() {
        assert!(SessionKey::parse("company:acme:CA1234").is_err());
    }

    #[test]
    fn parse_missing_company_prefix_returns_err() {
        assert!(SessionKey::parse("channel:voice:CA1234").is_err());
    }

    #[test]
    fn monotonic_lock_does_not_reset() {
        let mut flag = true;
        assert!(!SessionLocks::set_once(&mut flag));
        assert!(flag);
    }

    #[test]
    fn slot_not_locked_until_confirmed() {
        let mut session = Session::new(SessionKey::new(CompanyId::from("acme"), Channel::Test, "t1"));
        session.collected_slots.insert("phone".into(), "2395551234".into());
        assert!(!session.slot_is_locked("phone"));
        session.booking.meta_mut("phone").confirmed = true;
        assert!(session.slot_is_locked("phone"));
    }
}
