//! The "Black Box" audit record (spec.md §4.10): one structured record per
//! turn, appended to an external store. Failure to append must never break
//! the turn — callers log and continue rather than propagate.

use receptionist_core::{Mode, Tier, Urgency};
use serde::{Deserialize, Serialize};

/// Response attribution (spec.md §4.10 "Response attribution").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResponseAttribution {
    pub response_source: Option<String>,
    pub tier: Option<String>,
    pub match_source: Option<String>,
    pub tokens_used: u32,
    pub latency_ms: u64,
    pub total_turn_latency_ms: u64,
}

/// Scenario-matching pipeline telemetry, populated only when the cascade ran
/// (spec.md §4.10 "Matching pipeline").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchingPipeline {
    pub fast_lookup_used: bool,
    pub candidate_count: u32,
    pub total_pool_size: u32,
    pub match_method: Option<String>,
    pub scenario_id_matched: Option<String>,
    pub match_confidence: Option<f64>,
    pub timing_ms: u64,
}

/// Deterministic post-response compliance check result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComplianceResult {
    pub passed: bool,
    pub hard_fail: bool,
    pub hard_fail_reason: Option<String>,
    pub score: f64,
    pub violations: Vec<String>,
}

/// Discovery-lane snapshot at time of audit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscoverySnapshot {
    pub issue: Option<String>,
    pub urgency: Urgency,
    pub tech_mentioned: bool,
    pub emotion: Option<String>,
}

/// One full turn audit record (spec.md §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    // Identifiers
    pub call_id: String,
    pub company_id: String,
    pub channel: String,
    pub session_id: String,
    pub turn_number: u32,
    pub turn_trace_id: String,
    pub timestamp: String,

    // Mode state
    pub mode: Mode,
    pub previous_mode: Mode,
    pub mode_transition: bool,
    pub phase: String,

    // Consent
    pub consent_detected: bool,
    pub consent_phrase: Option<String>,
    pub consent_given: bool,
    pub booking_started: bool,
    pub consent_pending_turn: bool,

    pub response: ResponseAttribution,
    pub matching: Option<MatchingPipeline>,

    /// Execution trace flags, e.g. `scenarioContext_provided`,
    /// `callerName_provided`, `consentGate_enforced`, `reply_generated`,
    /// `compliance_passed`/`compliance_failed`, `name_placeholder_leaked`,
    /// `verbosity_exceeded`.
    pub execution_flags: Vec<String>,

    pub compliance: ComplianceResult,
    pub discovery: DiscoverySnapshot,
}

impl AuditRecord {
    pub fn tier_as_str(tier: Option<Tier>) -> Option<String> {
        tier.map(|t| t.as_str().to_string())
    }
}

/// A single transcript line appended alongside (or independent of) a turn's
/// audit record (spec.md §6.8 `addTranscript`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub call_id: String,
    pub company_id: String,
    pub speaker: String,
    pub turn: u32,
    pub text: String,
    pub confidence: Option<f64>,
    pub source: Option<String>,
    pub timestamp: String,
}

/// A named, free-form event attached to a call (spec.md §6.8 `addEvent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub call_id: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}
